// Connect-protocol RPC client
//
// Wraps `reqwest::Client` with service/method URL construction, unary JSON
// calls, error-body decoding, and enveloped server streaming. The aim and
// pirem clients are thin typed layers over this module.

use bytes::{Buf, BufMut, Bytes, BytesMut};
use futures_core::Stream;
use futures_util::StreamExt;
use reqwest::header::CONTENT_TYPE;
use serde::Serialize;
use serde::de::DeserializeOwned;
use tracing::{debug, trace};
use url::Url;

use crate::error::Error;
use crate::models::ErrorBody;
use crate::transport::TransportConfig;

const PROTOCOL_VERSION_HEADER: &str = "Connect-Protocol-Version";
const STREAM_CONTENT_TYPE: &str = "application/connect+json";

/// Envelope flag marking the end-of-stream trailer.
const END_STREAM_FLAG: u8 = 0x02;
const ENVELOPE_HEADER_LEN: usize = 5;
/// Upper bound for a single streamed message.
const MAX_MESSAGE_LEN: usize = 4 * 1024 * 1024;

/// Raw RPC client for one backend base URL.
#[derive(Clone)]
pub(crate) struct ConnectClient {
    http: reqwest::Client,
    streaming_http: reqwest::Client,
    base_url: Url,
}

impl ConnectClient {
    pub(crate) fn new(base_url: Url, transport: &TransportConfig) -> Result<Self, Error> {
        Ok(Self::with_clients(
            base_url,
            transport.build_client()?,
            transport.build_streaming_client()?,
        ))
    }

    /// Build from a pre-configured `reqwest::Client`, used for both unary
    /// and streaming calls.
    pub(crate) fn from_reqwest(base_url: &str, http: reqwest::Client) -> Result<Self, Error> {
        let url = Url::parse(base_url)?;
        Ok(Self::with_clients(url, http.clone(), http))
    }

    fn with_clients(mut base_url: Url, http: reqwest::Client, streaming_http: reqwest::Client) -> Self {
        // `Url::join` replaces the last path segment unless it ends in '/'.
        if !base_url.path().ends_with('/') {
            let path = format!("{}/", base_url.path());
            base_url.set_path(&path);
        }
        Self {
            http,
            streaming_http,
            base_url,
        }
    }

    pub(crate) fn base_url(&self) -> &Url {
        &self.base_url
    }

    /// `{base}/{service}/{method}`
    pub(crate) fn method_url(&self, service: &str, method: &str) -> Result<Url, Error> {
        Ok(self.base_url.join(&format!("{service}/{method}"))?)
    }

    // ── Unary ────────────────────────────────────────────────────────

    /// POST a JSON request and decode the JSON response.
    pub(crate) async fn unary<Req, Resp>(
        &self,
        service: &str,
        method: &str,
        request: &Req,
    ) -> Result<Resp, Error>
    where
        Req: Serialize + ?Sized,
        Resp: DeserializeOwned,
    {
        let url = self.method_url(service, method)?;
        debug!("POST {}", url);

        let resp = self
            .http
            .post(url)
            .header(PROTOCOL_VERSION_HEADER, "1")
            .json(request)
            .send()
            .await?;

        let status = resp.status();
        let body = resp.text().await?;

        if !status.is_success() {
            return Err(error_from_body(status.as_u16(), &body));
        }

        decode_json(&body)
    }

    // ── Server streaming ─────────────────────────────────────────────

    /// Open a server-streamed call and yield each decoded message.
    ///
    /// The stream ends after the end-of-stream trailer. A trailer carrying
    /// an error, a non-2xx status or a truncated frame is yielded as the
    /// final `Err` item.
    pub(crate) fn server_stream<Req, Resp>(
        &self,
        service: &str,
        method: &str,
        request: &Req,
    ) -> impl Stream<Item = Result<Resp, Error>> + Send + 'static
    where
        Req: Serialize + ?Sized,
        Resp: DeserializeOwned + Send + 'static,
    {
        let http = self.streaming_http.clone();
        let url = self.method_url(service, method);
        let body = encode_envelope(request);

        async_stream::try_stream! {
            let url = url?;
            let body = body?;
            debug!("POST {} (stream)", url);

            let resp = http
                .post(url)
                .header(PROTOCOL_VERSION_HEADER, "1")
                .header(CONTENT_TYPE, STREAM_CONTENT_TYPE)
                .body(body)
                .send()
                .await?;

            let status = resp.status();
            let resp = if status.is_success() {
                resp
            } else {
                let text = resp.text().await?;
                Err::<reqwest::Response, Error>(error_from_body(status.as_u16(), &text))?
            };

            let mut decoder = EnvelopeDecoder::default();
            let mut chunks = resp.bytes_stream();
            let mut finished = false;

            'read: while let Some(chunk) = chunks.next().await {
                decoder.push(&chunk?);
                while let Some(frame) = decoder.next_frame()? {
                    if frame.is_end_stream() {
                        trace!("end-of-stream trailer received");
                        check_trailer(&frame.payload)?;
                        finished = true;
                        break 'read;
                    }
                    let message: Resp = decode_json_bytes(&frame.payload)?;
                    yield message;
                }
            }

            if !finished && !decoder.is_empty() {
                Err::<(), Error>(Error::Framing("stream ended inside a frame".into()))?;
            }
        }
    }
}

// ── Envelope framing ─────────────────────────────────────────────────

/// A single length-prefixed message.
#[derive(Debug)]
pub(crate) struct Envelope {
    pub flags: u8,
    pub payload: Bytes,
}

impl Envelope {
    pub(crate) fn is_end_stream(&self) -> bool {
        self.flags & END_STREAM_FLAG != 0
    }
}

/// Incremental decoder: chunk boundaries never line up with frames.
#[derive(Debug, Default)]
pub(crate) struct EnvelopeDecoder {
    buf: BytesMut,
}

impl EnvelopeDecoder {
    pub(crate) fn push(&mut self, chunk: &[u8]) {
        self.buf.extend_from_slice(chunk);
    }

    pub(crate) fn is_empty(&self) -> bool {
        self.buf.is_empty()
    }

    /// Pop the next complete frame, or `None` if more bytes are needed.
    pub(crate) fn next_frame(&mut self) -> Result<Option<Envelope>, Error> {
        let Some(mut header) = self.buf.get(..ENVELOPE_HEADER_LEN) else {
            return Ok(None);
        };
        let flags = header.get_u8();
        let len = usize::try_from(header.get_u32())
            .map_err(|_| Error::Framing("frame length overflows usize".into()))?;

        if len > MAX_MESSAGE_LEN {
            return Err(Error::Framing(format!(
                "frame of {len} bytes exceeds the {MAX_MESSAGE_LEN} byte limit"
            )));
        }
        if self.buf.len() < ENVELOPE_HEADER_LEN + len {
            return Ok(None);
        }

        self.buf.advance(ENVELOPE_HEADER_LEN);
        let payload = self.buf.split_to(len).freeze();
        Ok(Some(Envelope { flags, payload }))
    }
}

/// Serialize `message` as a single uncompressed data frame.
pub(crate) fn encode_envelope<T: Serialize + ?Sized>(message: &T) -> Result<Vec<u8>, Error> {
    let payload = serde_json::to_vec(message).map_err(|e| Error::Deserialization {
        message: format!("failed to encode request: {e}"),
        body: String::new(),
    })?;
    let len = u32::try_from(payload.len())
        .map_err(|_| Error::Framing("request too large for a single frame".into()))?;

    let mut out = BytesMut::with_capacity(ENVELOPE_HEADER_LEN + payload.len());
    out.put_u8(0);
    out.put_u32(len);
    out.put_slice(&payload);
    Ok(out.to_vec())
}

#[derive(Debug, Default, serde::Deserialize)]
struct EndStream {
    #[serde(default)]
    error: Option<ErrorBody>,
}

fn check_trailer(payload: &[u8]) -> Result<(), Error> {
    if payload.is_empty() {
        return Ok(());
    }
    let trailer: EndStream = decode_json_bytes(payload)?;
    match trailer.error {
        Some(err) => Err(Error::Rpc {
            code: err.code.unwrap_or_else(|| "unknown".into()),
            message: err.message.unwrap_or_default(),
            status: 200,
        }),
        None => Ok(()),
    }
}

// ── Body decoding ────────────────────────────────────────────────────

fn decode_json<T: DeserializeOwned>(body: &str) -> Result<T, Error> {
    // Empty messages may be sent as an empty body.
    let body = if body.trim().is_empty() { "{}" } else { body };
    serde_json::from_str(body).map_err(|e| Error::Deserialization {
        message: e.to_string(),
        body: body.to_owned(),
    })
}

fn decode_json_bytes<T: DeserializeOwned>(payload: &[u8]) -> Result<T, Error> {
    serde_json::from_slice(payload).map_err(|e| Error::Deserialization {
        message: e.to_string(),
        body: String::from_utf8_lossy(payload).into_owned(),
    })
}

/// Build an `Error::Rpc` from a non-2xx response body.
///
/// Falls back to a code derived from the HTTP status when the body is not
/// a Connect error object (e.g. a proxy error page).
pub(crate) fn error_from_body(status: u16, body: &str) -> Error {
    let parsed: ErrorBody = serde_json::from_str(body).unwrap_or_default();
    Error::Rpc {
        code: parsed
            .code
            .unwrap_or_else(|| code_for_status(status).to_owned()),
        message: parsed.message.unwrap_or_else(|| body.trim().to_owned()),
        status,
    }
}

fn code_for_status(status: u16) -> &'static str {
    match status {
        400 => "invalid_argument",
        401 => "unauthenticated",
        403 => "permission_denied",
        404 => "not_found",
        408 | 504 => "deadline_exceeded",
        429 | 502 | 503 => "unavailable",
        _ => "unknown",
    }
}
