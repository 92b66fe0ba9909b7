//! Test harness: a mock remote service behind the blocking client.
//!
//! `wiremock` is async, the client is blocking. The harness owns a
//! multi-thread runtime that hosts the mock server; test code stays
//! synchronous and calls the client directly.

use wiremock::{Mock, MockServer};

use super::ApiClient;

pub struct RemoteApi {
    rt: tokio::runtime::Runtime,
    server: MockServer,
}

impl RemoteApi {
    /// Start a mock remote service on a random local port.
    pub fn start() -> Self {
        let rt = tokio::runtime::Builder::new_multi_thread()
            .worker_threads(1)
            .enable_all()
            .build()
            .expect("failed to build test runtime");
        let server = rt.block_on(MockServer::start());
        Self { rt, server }
    }

    /// Mount a mock. Mount order is match order; pair `up_to_n_times`
    /// mocks with a catch-all mounted after them to script sequences.
    pub fn mount(&self, mock: Mock) {
        self.rt.block_on(mock.mount(&self.server));
    }

    /// A client pointed at the mock service.
    pub fn client(&self) -> ApiClient {
        ApiClient::new(self.server.uri()).expect("failed to build test client")
    }

    /// How many requests the mock service has received so far.
    pub fn request_count(&self) -> usize {
        self.rt
            .block_on(self.server.received_requests())
            .map_or(0, |requests| requests.len())
    }
}
