//! Shared test helpers.

mod fake_gateway;

pub(in crate::tests) use fake_gateway::FakeGateway;
