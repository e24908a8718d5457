//! Route estimation across mock bridges

mod mocks;

use std::sync::Arc;

use mocks::{TestEnvBuilder, ONE_USDC};
use movr::mocks::{MockBridgeAdapter, QuoteBehaviour};
use movr::{Amount, Chain, CompletionProtocol, RouteError, RouteSelectionPolicy, RouteValidationError};

#[tokio::test]
async fn test_best_output_first_across_bridges() {
	let env = TestEnvBuilder::new()
		.adapter(Arc::new(MockBridgeAdapter::one_step("hop").quoting(995_000, 300)))
		.adapter(Arc::new(MockBridgeAdapter::two_step("connext").quoting(998_000, 900)))
		.build();

	let routes = env
		.mover
		.estimate(
			&env.usdc,
			&env.polygon,
			&env.gnosis,
			Amount::new(ONE_USDC),
			RouteSelectionPolicy::MaxOutput,
		)
		.await
		.unwrap();

	assert_eq!(routes.len(), 2);
	assert_eq!(routes[0].bridge_name, "connext");
	assert_eq!(routes[0].estimated_output, Amount::new(998_000));
	assert_eq!(routes[0].fee, Amount::new(2_000));
	assert_eq!(
		routes[0].completion_protocol,
		CompletionProtocol::TwoStepClaim
	);
	assert_eq!(routes[1].bridge_name, "hop");
	assert_ne!(routes[0].route_id, routes[1].route_id);
	assert!(routes.iter().all(|r| r.amount == Amount::new(ONE_USDC)));
	assert!(routes.iter().all(|r| r.expires_at.is_none()));
}

#[tokio::test]
async fn test_failing_and_slow_bridges_are_excluded() {
	let env = TestEnvBuilder::new()
		.adapter(Arc::new(MockBridgeAdapter::one_step("hop").quoting(995_000, 300)))
		.adapter(Arc::new(
			MockBridgeAdapter::one_step("broken").with_quote(QuoteBehaviour::Fail),
		))
		.adapter(Arc::new(
			MockBridgeAdapter::one_step("sleepy").with_quote(QuoteBehaviour::Hang),
		))
		.adapter(Arc::new(MockBridgeAdapter::one_step("dry").quoting(0, 60)))
		.build();

	let started = std::time::Instant::now();
	let routes = env
		.mover
		.estimate(
			&env.usdc,
			&env.polygon,
			&env.gnosis,
			Amount::new(ONE_USDC),
			RouteSelectionPolicy::MaxOutput,
		)
		.await
		.unwrap();

	let names: Vec<_> = routes.iter().map(|r| r.bridge_name.as_str()).collect();
	assert_eq!(names, vec!["hop"]);
	// Bounded by the adapter timeout, not by the hanging bridge
	assert!(started.elapsed() < std::time::Duration::from_secs(2));
}

#[tokio::test]
async fn test_no_route_when_every_bridge_fails() {
	let env = TestEnvBuilder::new()
		.adapter(Arc::new(
			MockBridgeAdapter::one_step("broken").with_quote(QuoteBehaviour::Fail),
		))
		.build();

	let result = env
		.mover
		.estimate(
			&env.usdc,
			&env.polygon,
			&env.gnosis,
			Amount::new(ONE_USDC),
			RouteSelectionPolicy::MaxOutput,
		)
		.await;

	assert!(matches!(
		result,
		Err(RouteError::NoRouteAvailable {
			source_chain_id: 137,
			destination_chain_id: 100
		})
	));
}

#[tokio::test]
async fn test_bridges_without_the_chain_pair_are_skipped() {
	let hop = Arc::new(
		MockBridgeAdapter::one_step("hop")
			.quoting(995_000, 300)
			.serving(&[1, 137]),
	);
	let env = TestEnvBuilder::new().adapter(hop).build();

	let result = env
		.mover
		.estimate(
			&env.usdc,
			&env.polygon,
			&env.gnosis,
			Amount::new(ONE_USDC),
			RouteSelectionPolicy::MaxOutput,
		)
		.await;
	assert!(matches!(result, Err(RouteError::NoRouteAvailable { .. })));
}

#[tokio::test]
async fn test_policies_reorder_routes() {
	let env = TestEnvBuilder::new()
		.adapter(Arc::new(MockBridgeAdapter::one_step("hop").with_quote(
			QuoteBehaviour::Quote {
				estimated_output: Amount::new(995_000),
				fee: Amount::new(1_000),
				eta_seconds: 120,
			},
		)))
		.adapter(Arc::new(MockBridgeAdapter::two_step("connext").with_quote(
			QuoteBehaviour::Quote {
				estimated_output: Amount::new(998_000),
				fee: Amount::new(2_000),
				eta_seconds: 1_800,
			},
		)))
		.build();

	let estimate = |policy| {
		let mover = env.mover.clone();
		let (usdc, polygon, gnosis) = (env.usdc.clone(), env.polygon.clone(), env.gnosis.clone());
		async move {
			mover
				.estimate(&usdc, &polygon, &gnosis, Amount::new(ONE_USDC), policy)
				.await
				.unwrap()
				.into_iter()
				.map(|r| r.bridge_name)
				.collect::<Vec<_>>()
		}
	};

	assert_eq!(
		estimate(RouteSelectionPolicy::MaxOutput).await,
		vec!["connext", "hop"]
	);
	assert_eq!(
		estimate(RouteSelectionPolicy::CheapestFee).await,
		vec!["hop", "connext"]
	);
	assert_eq!(
		estimate(RouteSelectionPolicy::FastestEta).await,
		vec!["hop", "connext"]
	);
}

#[tokio::test]
async fn test_invalid_requests_rejected_before_quoting() {
	let env = TestEnvBuilder::new()
		.adapter(Arc::new(MockBridgeAdapter::one_step("hop").quoting(995_000, 300)))
		.build();

	let zero = env
		.mover
		.estimate(
			&env.usdc,
			&env.polygon,
			&env.gnosis,
			Amount::ZERO,
			RouteSelectionPolicy::MaxOutput,
		)
		.await;
	assert!(matches!(
		zero,
		Err(RouteError::Validation(RouteValidationError::ZeroAmount))
	));

	let same_chain = env
		.mover
		.estimate(
			&env.usdc,
			&env.polygon,
			&env.polygon,
			Amount::new(ONE_USDC),
			RouteSelectionPolicy::MaxOutput,
		)
		.await;
	assert!(matches!(
		same_chain,
		Err(RouteError::Validation(RouteValidationError::SameChain {
			chain_id: 137
		}))
	));

	let ethereum = Chain::new(1, "http://ethereum.test");
	let wrong_chain = env
		.mover
		.estimate(
			&env.usdc,
			&ethereum,
			&env.gnosis,
			Amount::new(ONE_USDC),
			RouteSelectionPolicy::MaxOutput,
		)
		.await;
	assert!(matches!(
		wrong_chain,
		Err(RouteError::Validation(
			RouteValidationError::TokenChainMismatch { chain_id: 1, .. }
		))
	));
}

#[tokio::test]
async fn test_quote_ttl_sets_expiry() {
	let env = TestEnvBuilder::new()
		.settings(|s| s.routing.quote_ttl_secs = Some(30))
		.adapter(Arc::new(MockBridgeAdapter::one_step("hop").quoting(995_000, 300)))
		.build();

	let routes = env
		.mover
		.estimate(
			&env.usdc,
			&env.polygon,
			&env.gnosis,
			Amount::new(ONE_USDC),
			RouteSelectionPolicy::MaxOutput,
		)
		.await
		.unwrap();

	let expires_at = routes[0].expires_at.expect("ttl configured");
	assert_eq!((expires_at - routes[0].quoted_at).num_seconds(), 30);
	assert!(!routes[0].is_expired());
}
