//! Permission bridge: answers setup-flow questions over a length-prefixed
//! JSON channel on stdin/stdout.
//!
//! Each message is a 4-byte little-endian length followed by that many bytes
//! of JSON. Requests look like `{"method": "canDrawOverlays"}`.

use crate::constants::MAX_BRIDGE_MESSAGE_SIZE;
use crate::error::AppError;
use crate::platform::PermissionProbe;
use log::{debug, warn};
use serde::{Deserialize, Serialize};
use std::io::{self, Read, Write};
use std::sync::Arc;

#[derive(Debug, Deserialize)]
pub struct BridgeRequest {
    pub method: String,
}

#[derive(Debug, PartialEq, Eq, Serialize)]
#[serde(tag = "type")]
pub enum BridgeResponse {
    #[serde(rename = "success")]
    Success { value: bool },
    #[serde(rename = "not_implemented")]
    NotImplemented { method: String },
    #[serde(rename = "error")]
    Error { message: String },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PermissionMethod {
    CanDrawOverlays,
    HasUsageAccess,
    IsMonitorEnabled,
}

impl PermissionMethod {
    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "canDrawOverlays" => Some(Self::CanDrawOverlays),
            "hasUsageAccess" => Some(Self::HasUsageAccess),
            "isAccessibilityServiceEnabled" | "isMonitorEnabled" => Some(Self::IsMonitorEnabled),
            _ => None,
        }
    }
}

pub struct PermissionBridge {
    probe: Arc<dyn PermissionProbe>,
}

impl PermissionBridge {
    pub fn new(probe: Arc<dyn PermissionProbe>) -> Self {
        Self { probe }
    }

    /// Serve requests until the input closes.
    pub fn run<R: Read, W: Write>(&self, input: &mut R, output: &mut W) -> io::Result<()> {
        loop {
            let body = read_message(input)?;
            let response = match serde_json::from_slice::<BridgeRequest>(&body) {
                Ok(request) => self.handle_request(&request),
                Err(e) => BridgeResponse::Error {
                    message: format!("malformed request: {e}"),
                },
            };
            write_message(output, &response)?;
        }
    }

    pub fn handle_request(&self, request: &BridgeRequest) -> BridgeResponse {
        match PermissionMethod::from_name(&request.method) {
            Some(method) => BridgeResponse::Success {
                value: self.query(method),
            },
            None => {
                debug!("Unknown bridge method {}", request.method);
                BridgeResponse::NotImplemented {
                    method: request.method.clone(),
                }
            }
        }
    }

    /// A failing probe answers `false`.
    pub fn query(&self, method: PermissionMethod) -> bool {
        let result: Result<bool, AppError> = match method {
            PermissionMethod::CanDrawOverlays => self.probe.can_draw_overlays(),
            PermissionMethod::HasUsageAccess => self.probe.has_usage_access(),
            PermissionMethod::IsMonitorEnabled => self.probe.is_monitor_enabled(),
        };
        result.unwrap_or_else(|e| {
            warn!("{method:?} check failed: {e}");
            false
        })
    }
}

fn read_message<R: Read>(input: &mut R) -> io::Result<Vec<u8>> {
    let mut len_bytes = [0u8; 4];
    input.read_exact(&mut len_bytes)?;
    let len = usize::try_from(u32::from_le_bytes(len_bytes))
        .map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))?;

    if len > MAX_BRIDGE_MESSAGE_SIZE {
        return Err(io::Error::new(
            io::ErrorKind::InvalidData,
            format!("Message too large: {len} bytes (max: {MAX_BRIDGE_MESSAGE_SIZE} bytes)"),
        ));
    }

    let mut buffer = vec![0u8; len];
    input.read_exact(&mut buffer)?;
    Ok(buffer)
}

fn write_message<W: Write>(output: &mut W, message: &BridgeResponse) -> io::Result<()> {
    let json = serde_json::to_vec(message)?;
    let len = u32::try_from(json.len()).map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))?;

    output.write_all(&len.to_le_bytes())?;
    output.write_all(&json)?;
    output.flush()?;

    Ok(())
}
