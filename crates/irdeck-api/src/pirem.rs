// pirem service client: the IR transmitter.

use url::Url;

use crate::connect::ConnectClient;
use crate::error::Error;
use crate::models::{Empty, IrData, SendIrRequest};
use crate::transport::TransportConfig;

const SERVICE: &str = "pirem.api.v1.PiRemService";

/// Typed client for `pirem.api.v1.PiRemService`.
#[derive(Clone)]
pub struct PiremClient {
    rpc: ConnectClient,
}

impl PiremClient {
    pub fn new(base_url: Url, transport: &TransportConfig) -> Result<Self, Error> {
        Ok(Self {
            rpc: ConnectClient::new(base_url, transport)?,
        })
    }

    pub fn from_reqwest(base_url: &str, http: reqwest::Client) -> Result<Self, Error> {
        Ok(Self {
            rpc: ConnectClient::from_reqwest(base_url, http)?,
        })
    }

    pub fn base_url(&self) -> &Url {
        self.rpc.base_url()
    }

    /// `SendIr` -- success means the transmitter accepted the request,
    /// not that the physical device reacted.
    pub async fn send_ir(&self, device_id: &str, ir_data: &IrData) -> Result<(), Error> {
        let _: Empty = self
            .rpc
            .unary(SERVICE, "SendIr", &SendIrRequest { device_id, ir_data })
            .await?;
        Ok(())
    }
}
