use serde::{Deserialize, Serialize};
use serde_json::json;

use crate::control_interface::Aurora;
use crate::util::error::NanoleafError;
use crate::util::transport::Method;

/// One panel's place in the layout.
#[derive(Deserialize, Serialize, Debug, Clone, Copy, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct PanelPosition {
    pub panel_id: u16,
    pub x: i32,
    pub y: i32,
    /// Rotation in degrees.
    pub o: i32,
    #[serde(default)]
    pub shape_type: Option<u8>,
}

#[derive(Deserialize, Serialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct PanelLayout {
    pub num_panels: u16,
    pub side_length: u16,
    pub position_data: Vec<PanelPosition>,
}

/// Position of the rhythm module. Coordinates are fractional on some firmware.
#[derive(Deserialize, Serialize, Debug, Clone, Copy, PartialEq)]
pub struct RhythmPosition {
    pub x: f64,
    pub y: f64,
    pub o: f64,
}

/// Sound source of the rhythm module.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RhythmMode {
    Microphone,
    AuxCable,
}

impl RhythmMode {
    pub fn code(&self) -> u8 {
        match self {
            RhythmMode::Microphone => 0,
            RhythmMode::AuxCable => 1,
        }
    }
}

impl TryFrom<u8> for RhythmMode {
    type Error = NanoleafError;

    fn try_from(code: u8) -> Result<Self, Self::Error> {
        match code {
            0 => Ok(RhythmMode::Microphone),
            1 => Ok(RhythmMode::AuxCable),
            other => Err(NanoleafError::InvalidResponse(format!(
                "unknown rhythm mode {}",
                other
            ))),
        }
    }
}

impl Aurora {
    ///////////////////////////////////////////
    // Layout
    ///////////////////////////////////////////

    /// Global orientation in degrees (0-360).
    pub async fn orientation(&self) -> Option<u16> {
        self.read("panelLayout/globalOrientation/value").await.ok()
    }

    pub async fn orientation_min(&self) -> Option<u16> {
        self.read("panelLayout/globalOrientation/min").await.ok()
    }

    pub async fn orientation_max(&self) -> Option<u16> {
        self.read("panelLayout/globalOrientation/max").await.ok()
    }

    pub async fn layout(&self) -> Option<PanelLayout> {
        self.read("panelLayout/layout").await.ok()
    }

    /// Number of light panels.
    ///
    /// Firmware counts an attached rhythm module as a panel; it is subtracted here.
    pub async fn panel_count(&self) -> Option<u16> {
        let count: u16 = self.read("panelLayout/layout/numPanels").await.ok()?;
        let rhythm_connected = self.rhythm_connected().await?;
        if rhythm_connected {
            Some(count.saturating_sub(1))
        } else {
            Some(count)
        }
    }

    /// Side length of a single panel.
    pub async fn panel_length(&self) -> Option<u16> {
        self.read("panelLayout/layout/sideLength").await.ok()
    }

    pub async fn panel_positions(&self) -> Option<Vec<PanelPosition>> {
        self.read("panelLayout/layout/positionData").await.ok()
    }

    ///////////////////////////////////////////
    // Rhythm module
    ///////////////////////////////////////////

    pub async fn rhythm_connected(&self) -> Option<bool> {
        self.read("rhythm/rhythmConnected").await.ok()
    }

    /// Whether the rhythm microphone is active.
    pub async fn rhythm_active(&self) -> Option<bool> {
        self.read("rhythm/rhythmActive").await.ok()
    }

    pub async fn rhythm_id(&self) -> Option<u32> {
        self.read("rhythm/rhythmId").await.ok()
    }

    pub async fn rhythm_hardware_version(&self) -> Option<String> {
        self.read("rhythm/hardwareVersion").await.ok()
    }

    pub async fn rhythm_firmware_version(&self) -> Option<String> {
        self.read("rhythm/firmwareVersion").await.ok()
    }

    /// Whether an aux cable is plugged into the rhythm module.
    pub async fn rhythm_aux_available(&self) -> Option<bool> {
        self.read("rhythm/auxAvailable").await.ok()
    }

    pub async fn rhythm_mode(&self) -> Option<RhythmMode> {
        let path = "rhythm/rhythmMode";
        let code: u8 = self.read(path).await.ok()?;
        RhythmMode::try_from(code)
            .map_err(|error| self.report(Method::Get, path, error))
            .ok()
    }

    pub async fn set_rhythm_mode(&self, mode: RhythmMode) -> Option<()> {
        self.write("rhythm", json!({ "rhythmMode": mode.code() }))
            .await
            .ok()
    }

    pub async fn rhythm_position(&self) -> Option<RhythmPosition> {
        self.read("rhythm/rhythmPos").await.ok()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::control_interface::test_support::{test_client, url};

    const LAYOUT: &str = r#"{"numPanels":3,"sideLength":150,"positionData":[
        {"panelId":107,"x":99,"y":173,"o":300,"shapeType":0},
        {"panelId":114,"x":24,"y":129,"o":240,"shapeType":0},
        {"panelId":1,"x":0,"y":0,"o":0,"shapeType":1}]}"#;

    #[tokio::test]
    async fn test_panel_count_excludes_rhythm_module() {
        let (aurora, transport, _) = test_client();
        transport
            .respond(Method::Get, &url("panelLayout/layout/numPanels"), 200, "10")
            .respond(Method::Get, &url("rhythm/rhythmConnected"), 200, "true");

        assert_eq!(aurora.panel_count().await, Some(9));
    }

    #[tokio::test]
    async fn test_panel_count_without_rhythm_module() {
        let (aurora, transport, _) = test_client();
        transport
            .respond(Method::Get, &url("panelLayout/layout/numPanels"), 200, "10")
            .respond(Method::Get, &url("rhythm/rhythmConnected"), 200, "false");

        assert_eq!(aurora.panel_count().await, Some(10));
    }

    #[tokio::test]
    async fn test_panel_count_is_absent_when_rhythm_read_fails() {
        let (aurora, transport, sink) = test_client();
        transport
            .respond(Method::Get, &url("panelLayout/layout/numPanels"), 200, "10")
            .respond(Method::Get, &url("rhythm/rhythmConnected"), 404, "");

        assert_eq!(aurora.panel_count().await, None);
        assert_eq!(sink.errors(), vec![NanoleafError::NotFound]);
    }

    #[tokio::test]
    async fn test_layout_decodes_positions() {
        let (aurora, transport, _) = test_client();
        transport.respond(Method::Get, &url("panelLayout/layout"), 200, LAYOUT);

        let layout = aurora.layout().await.unwrap();
        assert_eq!(layout.num_panels, 3);
        assert_eq!(layout.side_length, 150);
        assert_eq!(
            layout.position_data[1],
            PanelPosition {
                panel_id: 114,
                x: 24,
                y: 129,
                o: 240,
                shape_type: Some(0),
            }
        );
    }

    #[tokio::test]
    async fn test_rhythm_mode_round_trip() {
        let (aurora, transport, sink) = test_client();
        transport
            .respond(Method::Get, &url("rhythm/rhythmMode"), 200, "1")
            .respond(Method::Put, &url("rhythm"), 204, "");

        assert_eq!(aurora.rhythm_mode().await, Some(RhythmMode::AuxCable));
        assert_eq!(
            aurora.set_rhythm_mode(RhythmMode::Microphone).await,
            Some(())
        );
        assert_eq!(
            transport.requests_with(Method::Put)[0].body,
            Some(json!({ "rhythmMode": 0 }))
        );
        assert!(sink.diagnostics().is_empty());
    }

    #[tokio::test]
    async fn test_unknown_rhythm_mode_is_reported() {
        let (aurora, transport, sink) = test_client();
        transport.respond(Method::Get, &url("rhythm/rhythmMode"), 200, "7");

        assert_eq!(aurora.rhythm_mode().await, None);
        assert!(matches!(
            sink.errors().as_slice(),
            [NanoleafError::InvalidResponse(_)]
        ));
    }

    #[tokio::test]
    async fn test_rhythm_position() {
        let (aurora, transport, _) = test_client();
        transport.respond(
            Method::Get,
            &url("rhythm/rhythmPos"),
            200,
            r#"{"x":-74.5,"y":43.3,"o":0}"#,
        );

        assert_eq!(
            aurora.rhythm_position().await,
            Some(RhythmPosition {
                x: -74.5,
                y: 43.3,
                o: 0.0,
            })
        );
    }
}
