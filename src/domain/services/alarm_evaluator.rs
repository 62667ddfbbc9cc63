use std::collections::HashMap;

use chrono::{DateTime, Utc};

use crate::domain::entities::alarm_event::AlarmEvent;
use crate::domain::entities::device::{Channel, ChannelKey, Device};
use crate::domain::entities::sample::ConvertedSample;
use crate::domain::value_objects::alarm::{AlarmPolicy, AlarmState};

/// Edge-triggered alarm latch per channel.
///
/// An event is produced only on `Normal → Triggered`. The latch re-arms once the
/// temperature is back at or below the policy's re-arm level; missing samples
/// leave it untouched.
#[derive(Debug, Default)]
pub struct AlarmEvaluator {
    policy: AlarmPolicy,
    states: HashMap<ChannelKey, AlarmState>,
}

impl AlarmEvaluator {
    #[must_use]
    pub fn new(policy: AlarmPolicy) -> Self {
        Self {
            policy,
            states: HashMap::new(),
        }
    }

    #[must_use]
    pub const fn policy(&self) -> AlarmPolicy {
        self.policy
    }

    #[must_use]
    pub fn state(&self, key: &ChannelKey) -> AlarmState {
        self.states.get(key).copied().unwrap_or_default()
    }

    /// Feed one temperature (or a missing sample) for a channel.
    pub fn evaluate(
        &mut self,
        device_id: &str,
        channel: &Channel,
        temperature: Option<f64>,
        timestamp: DateTime<Utc>,
    ) -> Option<AlarmEvent> {
        let temperature = temperature?;
        let key = ChannelKey::new(device_id, channel.address.clone());
        let state = self.states.entry(key).or_default();

        match *state {
            AlarmState::Normal if temperature > channel.threshold => {
                *state = AlarmState::Triggered;
                Some(AlarmEvent {
                    device_id: device_id.to_string(),
                    channel_address: channel.address.clone(),
                    channel_label: channel.label.clone(),
                    temperature,
                    threshold: channel.threshold,
                    timestamp,
                })
            }
            AlarmState::Triggered if temperature <= self.policy.rearm_level(channel.threshold) => {
                *state = AlarmState::Normal;
                None
            }
            _ => None,
        }
    }

    /// Evaluate every channel of a converted sample, in channel order.
    pub fn evaluate_sample(&mut self, device: &Device, sample: &ConvertedSample) -> Vec<AlarmEvent> {
        device
            .channels
            .iter()
            .enumerate()
            .filter_map(|(index, channel)| {
                let temperature = sample.value(index).map(|v| v.temperature);
                self.evaluate(&device.id, channel, temperature, sample.timestamp)
            })
            .collect()
    }
}
