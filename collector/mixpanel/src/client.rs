use crate::config::MixpanelClientConfig;
use crate::error::MixpanelError;
use crate::query::{QueryRequest, EXPORT_ENDPOINT};
use base64::{engine::general_purpose::STANDARD as base64, Engine as _};
use log::*;
use reqwest::Client;
use std::time::Duration;

/// The access point to the Mixpanel HTTP API.
#[async_trait::async_trait]
pub trait MixpanelApi {
    /// Performs the request and returns the body of a successful response.
    async fn request(&self, request: &QueryRequest) -> Result<String, MixpanelError>;
}

#[derive(Clone)]
pub struct ApiClient {
    pub api_url: String,
    pub data_api_url: String,
    api_key: Option<String>,
    http_auth_header: String,
    client: Client,
}

impl ApiClient {
    pub fn new(config: &MixpanelClientConfig) -> Result<ApiClient, MixpanelError> {
        config.validate()?;
        let credentials = config.resolve_credentials()?;

        // Mixpanel authenticates the API secret as the basic auth username, with an empty password
        let auth = format!("{}:", credentials.secret_key);
        let http_auth_header = format!("Basic {}", base64.encode(auth));

        let mut client_builder = Client::builder()
            .use_rustls_tls()
            .timeout(Duration::from_secs(config.timeout_secs.unwrap_or(
                crate::config::DEFAULT_TIMEOUT_SECS,
            )));

        if config.disable_ssl_verification {
            client_builder = client_builder.danger_accept_invalid_certs(true)
        }

        let client = client_builder.build().map_err(|err| MixpanelError::ConfigurationError {
            message: format!("Error while building the Mixpanel ApiClient. Err: {:?}", err),
        })?;

        Ok(ApiClient {
            api_url: trim_trailing_slash(&config.api_url),
            data_api_url: trim_trailing_slash(&config.data_api_url),
            api_key: credentials.api_key,
            http_auth_header,
            client,
        })
    }

    fn url_for(&self, endpoint: &str) -> String {
        let base_url = if endpoint == EXPORT_ENDPOINT { &self.data_api_url } else { &self.api_url };
        format!("{}/{}", base_url, endpoint)
    }
}

fn trim_trailing_slash(url: &str) -> String {
    url.trim_end_matches('/').to_owned()
}

#[async_trait::async_trait]
impl MixpanelApi for ApiClient {
    #[tracing::instrument(level = "debug", name = "MixpanelRequest", err, skip_all, fields(endpoint = request.endpoint))]
    async fn request(&self, request: &QueryRequest) -> Result<String, MixpanelError> {
        let url = self.url_for(request.endpoint);

        trace!("ApiClient - HTTP GET - url: {} - params: {:?}", url, request.params);

        let mut params = request.params.clone();
        if let Some(api_key) = &self.api_key {
            params.push(("api_key", api_key.clone()));
        }

        let response = self
            .client
            .get(&url)
            .header(reqwest::header::ACCEPT, "application/json")
            .header(reqwest::header::AUTHORIZATION, &self.http_auth_header)
            .query(&params)
            .send()
            .await
            .map_err(|err| MixpanelError::RequestError {
                message: format!("ApiClient - Connection to [{}] failed. Err: {:?}", url, err),
                status: None,
            })?;

        let response_status = response.status();

        let response_body = response.text().await.map_err(|err| MixpanelError::RequestError {
            message: format!("ApiClient - Cannot extract response body. Err: {:?}", err),
            status: Some(response_status.as_u16()),
        })?;

        if !response_status.is_success() {
            return Err(MixpanelError::RequestError {
                message: format!(
                    "ApiClient - Mixpanel API returned an error. Response status: {}. Response body: {}",
                    response_status, response_body
                ),
                status: Some(response_status.as_u16()),
            });
        }

        debug!("ApiClient - Received response from [{}]", url);
        Ok(response_body)
    }
}
