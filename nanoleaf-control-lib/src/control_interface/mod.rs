use std::fmt;
use std::sync::Arc;

use log::debug;
use serde::de::DeserializeOwned;
use serde_json::{json, Value};

use crate::led::led_color::{hsb_from_rgb, rgb_from_hsb, Hsb, Rgb, PERCENT_RANGE};
use crate::util::auth::API_PORT;
use crate::util::diagnostics::{Diagnostic, DiagnosticSink, LogSink};
use crate::util::discovery::DiscoveredDevice;
use crate::util::error::NanoleafError;
use crate::util::transport::{HttpTransport, Method, RawResponse, ReqwestTransport};

pub mod effects;
pub mod layout;

/// A normalized successful response.
#[derive(Debug, Clone, PartialEq)]
pub enum Reply {
    /// The decoded JSON body.
    Json(Value),
    /// Success without content.
    Empty,
}

/// Turns a raw response into a [`Reply`] or the matching [`NanoleafError`].
///
/// A `200` with an empty body counts as no content, same as `204`: firmware
/// 2.2.0 answers `200` to requests that should answer `204`, e.g. deleting
/// the auth token.
pub fn normalize(response: &RawResponse) -> Result<Reply, NanoleafError> {
    match response.status {
        200 if response.body.trim().is_empty() => Ok(Reply::Empty),
        200 => serde_json::from_str(&response.body)
            .map(Reply::Json)
            .map_err(|e| NanoleafError::InvalidResponse(e.to_string())),
        204 => Ok(Reply::Empty),
        status => Err(NanoleafError::from_status(status).unwrap_or(NanoleafError::Unknown(status))),
    }
}

/// Numeric state values that share the same read/write layout under `state/`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StateField {
    /// 0-100
    Brightness,
    /// 0-360
    Hue,
    /// 0-100
    Saturation,
    /// 1200-6500
    ColorTemperature,
}

impl StateField {
    pub fn key(&self) -> &'static str {
        match self {
            StateField::Brightness => "brightness",
            StateField::Hue => "hue",
            StateField::Saturation => "sat",
            StateField::ColorTemperature => "ct",
        }
    }
}

impl fmt::Display for StateField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.key())
    }
}

/// Client for one paired Aurora controller.
///
/// Holds the address and auth token and nothing else; every call is an
/// independent request. Failures are reported to the diagnostic sink and come
/// back as `None`.
#[derive(Clone)]
pub struct Aurora {
    address: String,
    auth_token: String,
    base_url: String,
    transport: Arc<dyn HttpTransport>,
    sink: Arc<dyn DiagnosticSink>,
}

impl fmt::Debug for Aurora {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Aurora")
            .field("address", &self.address)
            .finish_non_exhaustive()
    }
}

/// Two clients are equal when they talk to the same device with the same token.
impl PartialEq for Aurora {
    fn eq(&self, other: &Aurora) -> bool {
        self.address == other.address && self.auth_token == other.auth_token
    }
}

impl Aurora {
    pub fn new(address: &str, auth_token: &str) -> Self {
        Self::with_transport(
            address,
            auth_token,
            Arc::new(ReqwestTransport::new()),
            Arc::new(LogSink),
        )
    }

    pub fn with_transport(
        address: &str,
        auth_token: &str,
        transport: Arc<dyn HttpTransport>,
        sink: Arc<dyn DiagnosticSink>,
    ) -> Self {
        Aurora {
            address: address.to_string(),
            auth_token: auth_token.to_string(),
            base_url: format!("http://{}:{}/api/v1/{}/", address, API_PORT, auth_token),
            transport,
            sink,
        }
    }

    pub fn from_discovered_device(device: &DiscoveredDevice, auth_token: &str) -> Self {
        Self::new(&device.address, auth_token)
    }

    pub fn address(&self) -> &str {
        &self.address
    }

    pub fn auth_token(&self) -> &str {
        &self.auth_token
    }

    /// `http://<address>:16021/api/v1/<token>/`
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    ///////////////////////////////////////////
    // Generic requests
    ///////////////////////////////////////////

    pub async fn get(&self, path: &str) -> Option<Reply> {
        self.request(Method::Get, path, None).await.ok()
    }

    pub async fn put(&self, path: &str, body: Value) -> Option<Reply> {
        self.request(Method::Put, path, Some(body)).await.ok()
    }

    pub async fn delete(&self, path: &str) -> Option<Reply> {
        self.request(Method::Delete, path, None).await.ok()
    }

    /// Issues one request and normalizes the outcome. Errors are reported before they are returned.
    pub(crate) async fn request(
        &self,
        method: Method,
        path: &str,
        body: Option<Value>,
    ) -> Result<Reply, NanoleafError> {
        let url = format!("{}{}", self.base_url, path);
        let outcome = match self.transport.send(method, &url, body.as_ref()).await {
            Ok(response) => {
                debug!("{} /{} -> {}", method, path, response.status);
                normalize(&response)
            }
            Err(e) => Err(NanoleafError::Unreachable(format!("{:#}", e))),
        };
        outcome.map_err(|error| self.report(method, path, error))
    }

    /// Issues one request and decodes the reply into `T`.
    pub(crate) async fn exchange<T: DeserializeOwned>(
        &self,
        method: Method,
        path: &str,
        body: Option<Value>,
    ) -> Result<T, NanoleafError> {
        let value = match self.request(method, path, body).await? {
            Reply::Json(value) => value,
            Reply::Empty => Value::Null,
        };
        serde_json::from_value(value).map_err(|e| {
            self.report(
                method,
                path,
                NanoleafError::InvalidResponse(e.to_string()),
            )
        })
    }

    pub(crate) async fn read<T: DeserializeOwned>(&self, path: &str) -> Result<T, NanoleafError> {
        self.exchange(Method::Get, path, None).await
    }

    pub(crate) async fn write(&self, path: &str, body: Value) -> Result<(), NanoleafError> {
        self.request(Method::Put, path, Some(body)).await.map(|_| ())
    }

    pub(crate) fn report(&self, method: Method, path: &str, error: NanoleafError) -> NanoleafError {
        self.sink.emit(Diagnostic::RequestFailed {
            address: self.address.clone(),
            method,
            path: path.to_string(),
            error: error.clone(),
        });
        error
    }

    pub(crate) fn sink(&self) -> &dyn DiagnosticSink {
        self.sink.as_ref()
    }

    ///////////////////////////////////////////
    // General
    ///////////////////////////////////////////

    /// The full device info dump. Mostly useful for debugging.
    pub async fn info(&self) -> Option<Value> {
        self.read("").await.ok()
    }

    pub async fn color_mode(&self) -> Option<String> {
        self.read("state/colorMode").await.ok()
    }

    /// Briefly flashes the panels on and off.
    pub async fn identify(&self) -> Option<()> {
        self.write("identify", json!({})).await.ok()
    }

    pub async fn firmware(&self) -> Option<String> {
        self.info_field("firmwareVersion").await
    }

    pub async fn model(&self) -> Option<String> {
        self.info_field("model").await
    }

    pub async fn serial_number(&self) -> Option<String> {
        self.info_field("serialNo").await
    }

    async fn info_field(&self, key: &str) -> Option<String> {
        let info = self.info().await?;
        match info.get(key).and_then(Value::as_str) {
            Some(value) => Some(value.to_string()),
            None => {
                self.report(
                    Method::Get,
                    "",
                    NanoleafError::InvalidResponse(format!("missing field {}", key)),
                );
                None
            }
        }
    }

    /// CAUTION: revokes this client's auth token on the device.
    pub async fn delete_user(&self) -> Option<()> {
        self.delete("").await.map(|_| ())
    }

    ///////////////////////////////////////////
    // On / Off
    ///////////////////////////////////////////

    pub async fn on(&self) -> Option<bool> {
        self.read("state/on/value").await.ok()
    }

    pub async fn set_on(&self, on: bool) -> Option<()> {
        self.write("state", json!({ "on": { "value": on } })).await.ok()
    }

    pub async fn off(&self) -> Option<bool> {
        self.on().await.map(|on| !on)
    }

    pub async fn set_off(&self, off: bool) -> Option<()> {
        self.set_on(!off).await
    }

    pub async fn toggle_on(&self) -> Option<()> {
        let on = self.on().await?;
        self.set_on(!on).await
    }

    ///////////////////////////////////////////
    // Numeric state
    ///////////////////////////////////////////

    pub async fn state_value(&self, field: StateField) -> Option<u16> {
        self.read(&format!("state/{}/value", field)).await.ok()
    }

    pub async fn state_min(&self, field: StateField) -> Option<u16> {
        self.read(&format!("state/{}/min", field)).await.ok()
    }

    pub async fn state_max(&self, field: StateField) -> Option<u16> {
        self.read(&format!("state/{}/max", field)).await.ok()
    }

    pub async fn set_state_value(&self, field: StateField, value: u16) -> Option<()> {
        self.write("state", json!({ field.key(): { "value": value } }))
            .await
            .ok()
    }

    /// Changes a state value by a relative amount; negative lowers it.
    pub async fn raise_state(&self, field: StateField, increment: i32) -> Option<()> {
        self.write("state", json!({ field.key(): { "increment": increment } }))
            .await
            .ok()
    }

    pub async fn lower_state(&self, field: StateField, decrement: i32) -> Option<()> {
        self.raise_state(field, -decrement).await
    }

    pub async fn brightness(&self) -> Option<u16> {
        self.state_value(StateField::Brightness).await
    }

    pub async fn set_brightness(&self, level: u16) -> Option<()> {
        self.set_state_value(StateField::Brightness, level).await
    }

    pub async fn hue(&self) -> Option<u16> {
        self.state_value(StateField::Hue).await
    }

    pub async fn set_hue(&self, hue: u16) -> Option<()> {
        self.set_state_value(StateField::Hue, hue).await
    }

    pub async fn saturation(&self) -> Option<u16> {
        self.state_value(StateField::Saturation).await
    }

    pub async fn set_saturation(&self, saturation: u16) -> Option<()> {
        self.set_state_value(StateField::Saturation, saturation).await
    }

    pub async fn color_temperature(&self) -> Option<u16> {
        self.state_value(StateField::ColorTemperature).await
    }

    pub async fn set_color_temperature(&self, kelvin: u16) -> Option<()> {
        self.set_state_value(StateField::ColorTemperature, kelvin)
            .await
    }

    ///////////////////////////////////////////
    // Color
    ///////////////////////////////////////////

    /// The current color, built from three separate reads.
    ///
    /// The reads are not atomic. If any of them fails there is no color at all.
    pub async fn rgb(&self) -> Option<Rgb> {
        let hue = self.hue().await?;
        let saturation = self.saturation().await?;
        let brightness = self.brightness().await?;
        Some(rgb_from_hsb(Hsb::new(
            hue,
            clamp_percent(saturation),
            clamp_percent(brightness),
        )))
    }

    /// Sets hue, saturation and brightness in a single write.
    pub async fn set_rgb(&self, color: Rgb) -> Option<()> {
        let hsb = hsb_from_rgb(color);
        self.write(
            "state",
            json!({
                "hue": { "value": hsb.hue },
                "sat": { "value": hsb.saturation },
                "brightness": { "value": hsb.brightness },
            }),
        )
        .await
        .ok()
    }
}

fn clamp_percent(value: u16) -> u8 {
    value.min(u16::from(PERCENT_RANGE)) as u8
}

#[cfg(test)]
pub(crate) mod test_support {
    use std::sync::Arc;

    use super::Aurora;
    use crate::util::diagnostics::CollectingSink;
    use crate::util::transport::mock::MockTransport;

    pub(crate) const ADDRESS: &str = "192.168.1.20";
    pub(crate) const TOKEN: &str = "abcdef0123456789";

    pub(crate) fn url(path: &str) -> String {
        format!("http://{}:16021/api/v1/{}/{}", ADDRESS, TOKEN, path)
    }

    pub(crate) fn test_client() -> (Aurora, Arc<MockTransport>, Arc<CollectingSink>) {
        let transport = Arc::new(MockTransport::new());
        let sink = Arc::new(CollectingSink::new());
        let aurora = Aurora::with_transport(ADDRESS, TOKEN, transport.clone(), sink.clone());
        (aurora, transport, sink)
    }
}
