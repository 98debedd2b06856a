//! One-shot device and appliance REST calls.
//!
//! Used for the initial device inventory and for the post-reconnect state
//! resynchronization. These are plain request/response calls; the session
//! invariants all live in the streaming side.

use serde::Deserialize;

use cielo_auth::SharedSession;
use cielo_core::{ApiEnvelope, Appliance, CieloConfig, Device};

use crate::dispatch::EventDispatcher;
use crate::errors::RestError;

/// Client for the device listing and appliance sync endpoints.
pub struct DeviceClient {
    http: reqwest::Client,
    config: CieloConfig,
    session: SharedSession,
}

impl DeviceClient {
    /// Create a device client reading auth from the shared session.
    pub fn new(config: CieloConfig, session: SharedSession) -> Self {
        Self {
            http: reqwest::Client::new(),
            config,
            session,
        }
    }

    /// List the account's devices.
    #[tracing::instrument(skip_all)]
    pub async fn devices(&self) -> Result<Vec<Device>, RestError> {
        let envelope: ApiEnvelope<DevicesData> = self
            .get(
                &format!("{}/web/devices", self.config.api_base_url),
                &[("limit", self.config.device_list_limit.to_string())],
            )
            .await?;
        let data = expect_data(envelope, "listDevices")?;
        tracing::debug!(count = data.list_devices.len(), "devices fetched");
        Ok(data.list_devices)
    }

    /// Fetch detailed appliance records for the given ids.
    #[tracing::instrument(skip_all)]
    pub async fn appliances(&self, ids: &[i64]) -> Result<Vec<Appliance>, RestError> {
        let id_list = format!(
            "[{}]",
            ids.iter()
                .map(ToString::to_string)
                .collect::<Vec<_>>()
                .join(",")
        );
        let envelope: ApiEnvelope<AppliancesData> = self
            .get(
                &format!("{}/web/sync/appliances/1", self.config.api_base_url),
                &[("applianceIdList", id_list)],
            )
            .await?;
        let data = expect_data(envelope, "listAppliances")?;
        Ok(data.list_appliances)
    }

    /// List devices with their appliance records joined in.
    ///
    /// Appliance ids are requested once each regardless of how many devices
    /// share them.
    pub async fn devices_with_appliances(&self) -> Result<Vec<Device>, RestError> {
        let mut devices = self.devices().await?;
        if devices.is_empty() {
            return Ok(devices);
        }

        let mut ids: Vec<i64> = Vec::new();
        for device in &devices {
            if !ids.contains(&device.appliance_id) {
                ids.push(device.appliance_id);
            }
        }

        let appliances = self.appliances(&ids).await?;
        for device in &mut devices {
            device.appliance = appliances
                .iter()
                .find(|a| a.appliance_id == device.appliance_id)
                .cloned();
        }
        Ok(devices)
    }

    /// Fetch the current device list and dispatch each record to the
    /// listener with the matching MAC. Used after a reconnect.
    #[tracing::instrument(skip_all)]
    pub async fn resync(&self, dispatcher: &EventDispatcher) -> Result<(), RestError> {
        let devices = self.devices().await?;
        dispatcher.dispatch_snapshot(&devices);
        Ok(())
    }

    async fn get<T: serde::de::DeserializeOwned>(
        &self,
        url: &str,
        query: &[(&str, String)],
    ) -> Result<ApiEnvelope<T>, RestError> {
        let snap = self.session.snapshot();
        let resp = self
            .http
            .get(url)
            .query(query)
            .header("authorization", &snap.access_token)
            .header("x-api-key", &snap.api_key)
            .header("referer", &self.config.home_url)
            .header("origin", &self.config.home_url)
            .header("user-agent", &self.config.user_agent)
            .send()
            .await?;

        let status = resp.status().as_u16();
        if status != 200 {
            let message = resp.text().await.unwrap_or_default();
            return Err(RestError::Rejected { status, message });
        }

        let text = resp.text().await?;
        serde_json::from_str(&text).map_err(|e| RestError::MalformedResponse(e.to_string()))
    }
}

fn expect_data<T>(envelope: ApiEnvelope<T>, what: &str) -> Result<T, RestError> {
    if !envelope.is_success() {
        return Err(RestError::Rejected {
            status: envelope.status,
            message: envelope.message,
        });
    }
    envelope
        .data
        .ok_or_else(|| RestError::MalformedResponse(format!("missing {what} payload")))
}

#[derive(Deserialize)]
struct DevicesData {
    #[serde(rename = "listDevices")]
    list_devices: Vec<Device>,
}

#[derive(Deserialize)]
struct AppliancesData {
    #[serde(rename = "listAppliances")]
    list_appliances: Vec<Appliance>,
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
