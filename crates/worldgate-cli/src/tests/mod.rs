mod client_behaviour;
mod support;
