//! REST transport for the backend command channel.

use async_trait::async_trait;
use reqwest::Client;
use shared::{
    error::GatewayError,
    protocol::{KeyPayload, ResultValue},
};
use url::Url;

use crate::{BackendGateway, ExecuteOptions};

/// Gateway over the backend's HTTP command endpoint.
///
/// Commands go to `POST {base}/command`; the synchronous key probe goes to
/// `POST {base}/keyPress` over a dedicated blocking client. Construct this
/// (and call the probe) from a plain thread, not inside an async runtime.
pub struct RestGateway {
    base: Url,
    http: Client,
    probe: reqwest::blocking::Client,
}

impl RestGateway {
    pub fn new(base: Url) -> Self {
        Self {
            base,
            http: Client::new(),
            probe: reqwest::blocking::Client::new(),
        }
    }

    fn endpoint(&self, path: &str) -> Result<Url, GatewayError> {
        self.base
            .join(path)
            .map_err(|err| GatewayError::Transport(err.to_string()))
    }
}

#[async_trait]
impl BackendGateway for RestGateway {
    async fn execute(
        &self,
        command: &str,
        options: ExecuteOptions,
    ) -> Result<ResultValue, GatewayError> {
        let url = self.endpoint("command")?;
        let body = serde_json::json!({
            "command": command,
            "render": options.render,
        });
        let response = self
            .http
            .post(url)
            .json(&body)
            .send()
            .await
            .map_err(|err| GatewayError::Transport(err.to_string()))?;
        let response = response
            .error_for_status()
            .map_err(|err| GatewayError::Transport(err.to_string()))?;
        response
            .json::<ResultValue>()
            .await
            .map_err(|err| GatewayError::InvalidResponse {
                command: command.to_string(),
                detail: err.to_string(),
            })
    }

    fn key_press_probe(&self, payload: &KeyPayload) -> Result<bool, GatewayError> {
        let url = self.endpoint("keyPress")?;
        let response = self
            .probe
            .post(url)
            .json(payload)
            .send()
            .map_err(|err| GatewayError::Transport(err.to_string()))?;
        let response = response
            .error_for_status()
            .map_err(|err| GatewayError::Transport(err.to_string()))?;
        response
            .json::<bool>()
            .map_err(|err| GatewayError::InvalidResponse {
                command: "keyPress".to_string(),
                detail: err.to_string(),
            })
    }
}
