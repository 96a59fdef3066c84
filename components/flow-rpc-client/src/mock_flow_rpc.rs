use mockito::{Mock, ServerGuard};

/// Mockito-backed access node, for exercising `FlowRpc` over real HTTP in
/// tests.
pub struct MockFlowRpc {
    pub url: String,
    client: ServerGuard,
}

impl Default for MockFlowRpc {
    fn default() -> Self {
        Self::new()
    }
}

impl MockFlowRpc {
    pub fn new() -> Self {
        let client = mockito::Server::new();
        let url = client.url().to_string();
        Self { client, url }
    }

    pub fn get_account_mock(&mut self, address: &str, body: &str) -> Mock {
        self.client
            .mock(
                "GET",
                format!("/v1/accounts/{address}?expand=contracts,keys").as_str(),
            )
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(body)
            .create()
    }

    pub fn get_latest_block_mock(&mut self, block_id: &str, height: u64) -> Mock {
        self.client
            .mock("GET", "/v1/blocks?height=sealed")
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(format!(
                r#"[{{"header":{{"id":"{block_id}","height":"{height}"}}}}]"#
            ))
            .create()
    }

    pub fn post_transaction_mock(&mut self, tx_id: &str) -> Mock {
        self.client
            .mock("POST", "/v1/transactions")
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(format!(r#"{{"id":"{tx_id}"}}"#))
            .create()
    }

    pub fn get_transaction_result_mock(&mut self, tx_id: &str, body: &str) -> Mock {
        self.client
            .mock("GET", format!("/v1/transaction_results/{tx_id}").as_str())
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(body)
            .create()
    }
}
