use log::info;
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};
use serde_json::{json, Value};

use crate::control_interface::{Aurora, Reply};
use crate::led::stream::{AuroraStream, StreamEndpoint};
use crate::util::diagnostics::Diagnostic;
use crate::util::error::NanoleafError;
use crate::util::transport::Method;

/// Built-in modes. They are reported as the active effect but never appear in the stored effects list.
pub const RESERVED_EFFECT_NAMES: [&str; 3] = ["*Static*", "*Dynamic*", "*Solid*"];

pub fn is_reserved_effect(name: &str) -> bool {
    RESERVED_EFFECT_NAMES.contains(&name)
}

impl Aurora {
    /// The name of the active effect.
    pub async fn effect(&self) -> Option<String> {
        self.read("effects/select").await.ok()
    }

    pub async fn set_effect(&self, name: &str) -> Option<()> {
        self.write("effects", json!({ "select": name })).await.ok()
    }

    /// Names of all effects stored on the device.
    pub async fn effects_list(&self) -> Option<Vec<String>> {
        self.read("effects/effectsList").await.ok()
    }

    /// Switches to a random stored effect other than the active one and returns its name.
    pub async fn effect_random(&self) -> Result<String, NanoleafError> {
        let mut rng = StdRng::from_entropy();
        self.effect_random_with(&mut rng).await
    }

    pub async fn effect_random_with<R: Rng + ?Sized>(
        &self,
        rng: &mut R,
    ) -> Result<String, NanoleafError> {
        let mut candidates: Vec<String> = self.read("effects/effectsList").await?;
        let active: String = self.read("effects/select").await?;

        if !is_reserved_effect(&active) {
            candidates.retain(|name| name != &active);
        }

        let Some(choice) = candidates.choose(rng).cloned() else {
            self.sink().emit(Diagnostic::NoAlternativeEffect {
                address: self.address().to_string(),
                active: Some(active),
            });
            return Err(NanoleafError::NoAlternative);
        };

        self.write("effects", json!({ "select": choice })).await?;
        info!("Switched {} to effect {}", self.address(), choice);
        Ok(choice)
    }

    /// Sends a raw effect definition, wrapped in the `write` envelope.
    ///
    /// `data` must follow the device's effect JSON structure; it is not validated here.
    pub async fn effect_set_raw(&self, data: Value) -> Option<Reply> {
        self.put("effects", json!({ "write": data })).await
    }

    pub async fn effect_details(&self, name: &str) -> Option<Value> {
        self.effect_command(json!({ "command": "request", "animName": name }))
            .await
    }

    pub async fn effect_details_all(&self) -> Option<Value> {
        self.effect_command(json!({ "command": "requestAll" })).await
    }

    pub async fn effect_delete(&self, name: &str) -> Option<()> {
        self.write(
            "effects",
            json!({ "write": { "command": "delete", "animName": name } }),
        )
        .await
        .ok()
    }

    pub async fn effect_rename(&self, old_name: &str, new_name: &str) -> Option<()> {
        self.write(
            "effects",
            json!({
                "write": {
                    "command": "rename",
                    "animName": old_name,
                    "newName": new_name,
                }
            }),
        )
        .await
        .ok()
    }

    /// Puts the device into external control mode and opens the UDP stream it names.
    pub async fn effect_stream(&self) -> Option<AuroraStream> {
        let endpoint: StreamEndpoint = self
            .exchange(
                Method::Put,
                "effects",
                Some(json!({ "write": { "command": "display", "animType": "extControl" } })),
            )
            .await
            .ok()?;

        match AuroraStream::connect(&endpoint).await {
            Ok(stream) => Some(stream),
            Err(e) => {
                self.report(
                    Method::Put,
                    "effects",
                    NanoleafError::Unreachable(format!("{:#}", e)),
                );
                None
            }
        }
    }

    async fn effect_command(&self, command: Value) -> Option<Value> {
        self.exchange(Method::Put, "effects", Some(json!({ "write": command })))
            .await
            .ok()
    }
}
