// aim service client: the remote catalogue.
//
// Lists remotes and their buttons, resolves a button to its signal payload,
// pushes a button directly on backends that support it, and streams
// catalogue changes.

use futures_core::Stream;
use futures_util::StreamExt;
use url::Url;

use crate::connect::ConnectClient;
use crate::error::Error;
use crate::models::{
    ButtonResponse, Empty, GetButtonsRequest, GetButtonsResponse, GetIrDataRequest,
    GetRemotesResponse, IrData, NotifyUpdateResponse, PushButtonRequest, RemoteChange,
    RemoteResponse,
};
use crate::transport::TransportConfig;

const SERVICE: &str = "aim.api.v1.AimService";

/// Typed client for `aim.api.v1.AimService`.
#[derive(Clone)]
pub struct AimClient {
    rpc: ConnectClient,
}

impl AimClient {
    pub fn new(base_url: Url, transport: &TransportConfig) -> Result<Self, Error> {
        Ok(Self {
            rpc: ConnectClient::new(base_url, transport)?,
        })
    }

    /// Create a client around an existing `reqwest::Client`.
    pub fn from_reqwest(base_url: &str, http: reqwest::Client) -> Result<Self, Error> {
        Ok(Self {
            rpc: ConnectClient::from_reqwest(base_url, http)?,
        })
    }

    pub fn base_url(&self) -> &Url {
        self.rpc.base_url()
    }

    /// `GetRemotes` -- the full catalogue, all-or-nothing.
    pub async fn get_remotes(&self) -> Result<Vec<RemoteResponse>, Error> {
        let resp: GetRemotesResponse = self.rpc.unary(SERVICE, "GetRemotes", &Empty {}).await?;
        Ok(resp.remotes)
    }

    /// `GetButtons` for a single remote.
    pub async fn get_buttons(&self, remote_id: &str) -> Result<Vec<ButtonResponse>, Error> {
        let resp: GetButtonsResponse = self
            .rpc
            .unary(SERVICE, "GetButtons", &GetButtonsRequest { remote_id })
            .await?;
        Ok(resp.buttons)
    }

    /// `GetIrData` -- resolve a button to its opaque signal payload.
    pub async fn get_ir_data(&self, remote_id: &str, button_id: &str) -> Result<IrData, Error> {
        let data: IrData = self
            .rpc
            .unary(
                SERVICE,
                "GetIrData",
                &GetIrDataRequest {
                    remote_id,
                    button_id,
                },
            )
            .await?;

        if data.0.is_null() || data.0.as_object().is_some_and(serde_json::Map::is_empty) {
            return Err(Error::Rpc {
                code: "not_found".into(),
                message: format!("no signal recorded for button {button_id}"),
                status: 200,
            });
        }
        Ok(data)
    }

    /// `PushButton` -- resolve and transmit in one call (direct backends).
    pub async fn push_button(&self, button_id: &str) -> Result<(), Error> {
        let _: Empty = self
            .rpc
            .unary(SERVICE, "PushButton", &PushButtonRequest { button_id })
            .await?;
        Ok(())
    }

    /// `NotifyUpdate` -- server-streamed catalogue changes.
    ///
    /// Yields one item per change; ends when the server closes the stream.
    pub fn notify_update(&self) -> impl Stream<Item = Result<RemoteChange, Error>> + Send + 'static {
        self.rpc
            .server_stream::<_, NotifyUpdateResponse>(SERVICE, "NotifyUpdate", &Empty {})
            .flat_map(|item| {
                let changes: Vec<Result<RemoteChange, Error>> = match item {
                    Ok(msg) => msg.into_changes().into_iter().map(Ok).collect(),
                    Err(e) => vec![Err(e)],
                };
                futures_util::stream::iter(changes)
            })
    }
}
