//! Session directory.
//!
//! Client-side cache of session membership, per-device state and the
//! screen-assigned player slots. It is fed by relay events in emission order
//! (plus the screen's own slot assignment) and answers synchronous lookups.
//!
//! While the directory is [`Phase::Uninitialized`] every lookup reports
//! "not found". Events are still accumulated and become visible once the
//! ready handshake completes.

use std::collections::{BTreeMap, HashSet};

use couchlink_proto::{
    constants::{GUEST_NICKNAME_PREFIX, SCREEN_DEVICE_ID},
    custom::CustomData,
    device::{DeviceId, DeviceState, Role},
};
use tracing::{debug, info, warn};

use crate::{
    config::{ClientConfig, MasterPolicy},
    error::ClientError,
};

/// Directory lifecycle. `Uninitialized -> Ready` happens once per session.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum Phase {
    #[default]
    Uninitialized,
    Ready {
        join_code: String,
    },
}

/// What a single device update did to the directory.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeviceChange {
    Joined,
    Updated {
        custom_changed: bool,
        premium_gained: bool,
    },
    Left,
    /// Leave for a handle that is not present.
    Ignored,
}

#[derive(Debug, Clone)]
struct DeviceEntry {
    state: DeviceState,
    /// Arrival sequence number. Rejoining after a leave counts as a new arrival.
    arrival: u64,
}

/// Client-side view of session membership and player slots.
#[derive(Debug)]
pub struct SessionDirectory {
    role: Role,
    master_policy: MasterPolicy,
    synchronize_time: bool,
    phase: Phase,
    own_device_id: Option<DeviceId>,
    server_time_offset_ms: Option<i64>,
    devices: BTreeMap<DeviceId, DeviceEntry>,
    /// Present entries of the last slot assignment; index is the player number.
    slots: Vec<DeviceId>,
    next_arrival: u64,
}

impl SessionDirectory {
    /// Empty, uninitialized directory for the configured role.
    pub fn new(config: &ClientConfig) -> Self {
        Self {
            role: config.role,
            master_policy: config.master_policy,
            synchronize_time: config.synchronize_time,
            phase: Phase::default(),
            own_device_id: None,
            server_time_offset_ms: None,
            devices: BTreeMap::new(),
            slots: Vec::new(),
            next_arrival: 0,
        }
    }

    /// Role this directory was configured for.
    pub fn role(&self) -> Role {
        self.role
    }

    /// Current lifecycle phase.
    pub fn phase(&self) -> &Phase {
        &self.phase
    }

    /// Whether the ready handshake has completed.
    pub fn is_ready(&self) -> bool {
        matches!(self.phase, Phase::Ready { .. })
    }

    /// Join code announced by the relay, once ready.
    pub fn join_code(&self) -> Option<&str> {
        match &self.phase {
            Phase::Ready { join_code } => Some(join_code.as_str()),
            Phase::Uninitialized => None,
        }
    }

    /// Handle of the local device, known once the session is ready.
    pub fn device_id(&self) -> Option<DeviceId> {
        self.own_device_id
    }

    /// Policy used to pick the master controller.
    pub fn master_policy(&self) -> MasterPolicy {
        self.master_policy
    }

    /// Switch the master controller policy.
    pub fn set_master_policy(&mut self, policy: MasterPolicy) {
        self.master_policy = policy;
    }

    /// Complete the ready handshake.
    pub fn mark_ready(
        &mut self,
        join_code: impl Into<String>,
        device_id: DeviceId,
        server_time_offset_ms: Option<i64>,
    ) -> Result<(), ClientError> {
        if self.is_ready() {
            return Err(ClientError::AlreadyReady);
        }
        if Role::of_device(device_id) != self.role {
            return Err(ClientError::InvalidArgument(format!(
                "device {device_id} cannot act as {}",
                self.role
            )));
        }

        let join_code = join_code.into();
        info!(
            join_code = %join_code,
            device_id,
            devices = self.devices.len(),
            "Session directory ready"
        );

        if self.synchronize_time {
            if server_time_offset_ms.is_none() {
                warn!("Time sync enabled but the relay sent no server time offset");
            }
            self.server_time_offset_ms = server_time_offset_ms;
        }
        self.own_device_id = Some(device_id);
        self.phase = Phase::Ready { join_code };
        Ok(())
    }

    /// Apply one directory-update event. `None` means the device left.
    pub fn record_device_update(
        &mut self,
        device_id: DeviceId,
        state: Option<DeviceState>,
    ) -> DeviceChange {
        let change = match state {
            Some(state) => self.upsert(device_id, state),
            None => match self.devices.remove(&device_id) {
                Some(_) => DeviceChange::Left,
                None => DeviceChange::Ignored,
            },
        };
        debug!(device_id, ?change, "Device update");
        change
    }

    fn upsert(&mut self, device_id: DeviceId, state: DeviceState) -> DeviceChange {
        match self.devices.get_mut(&device_id) {
            Some(entry) => {
                if entry.state.uid != state.uid {
                    warn!(
                        device_id,
                        old_uid = %entry.state.uid,
                        uid = %state.uid,
                        "Device handle now reports a different uid"
                    );
                }
                let custom_changed = entry.state.custom != state.custom;
                let premium_gained = !entry.state.premium && state.premium;
                entry.state = state;
                DeviceChange::Updated {
                    custom_changed,
                    premium_gained,
                }
            }
            None => {
                let arrival = self.next_arrival;
                self.next_arrival += 1;
                self.devices
                    .insert(device_id, DeviceEntry { state, arrival });
                DeviceChange::Joined
            }
        }
    }

    fn entry(&self, device_id: DeviceId) -> Option<&DeviceEntry> {
        if !self.is_ready() {
            return None;
        }
        self.devices.get(&device_id)
    }

    /// Full record of a present device.
    pub fn device(&self, device_id: DeviceId) -> Option<&DeviceState> {
        self.entry(device_id).map(|e| &e.state)
    }

    /// Custom state of a present device, if it has published one.
    pub fn custom_state(&self, device_id: DeviceId) -> Option<&CustomData> {
        self.device(device_id).and_then(|s| s.custom.as_ref())
    }

    /// Stable user identifier of a present device.
    pub fn uid(&self, device_id: DeviceId) -> Option<&str> {
        self.device(device_id).map(|s| s.uid.as_str())
    }

    /// Nickname of a present device, `"Guest <id>"` when it has none.
    pub fn nickname(&self, device_id: DeviceId) -> Option<String> {
        self.device(device_id).map(|s| {
            s.nickname
                .clone()
                .unwrap_or_else(|| format!("{GUEST_NICKNAME_PREFIX} {device_id}"))
        })
    }

    /// Profile picture URL of a present device, if it has one.
    pub fn profile_picture(&self, device_id: DeviceId) -> Option<&str> {
        self.device(device_id).and_then(|s| s.picture.as_deref())
    }

    /// Premium flag of a present device.
    pub fn is_premium(&self, device_id: DeviceId) -> Option<bool> {
        self.device(device_id).map(|s| s.premium)
    }

    /// Whether the user behind a present device is logged in.
    pub fn is_user_logged_in(&self, device_id: DeviceId) -> Option<bool> {
        self.device(device_id).map(|s| s.login)
    }

    /// Slow-connection flag of a present device. Unreported counts as `false`.
    pub fn has_slow_connection(&self, device_id: DeviceId) -> Option<bool> {
        self.device(device_id)
            .map(|s| s.slow_connection.unwrap_or(false))
    }

    fn present_by_arrival(&self) -> Vec<(DeviceId, &DeviceEntry)> {
        if !self.is_ready() {
            return Vec::new();
        }
        let mut entries: Vec<_> = self.devices.iter().map(|(id, e)| (*id, e)).collect();
        entries.sort_by_key(|(_, e)| e.arrival);
        entries
    }

    /// All present handles, screen included, in arrival order.
    pub fn device_ids(&self) -> Vec<DeviceId> {
        self.present_by_arrival()
            .into_iter()
            .map(|(id, _)| id)
            .collect()
    }

    /// Present controller handles in arrival order.
    pub fn controller_ids(&self) -> Vec<DeviceId> {
        self.present_by_arrival()
            .into_iter()
            .filter(|(id, _)| *id != SCREEN_DEVICE_ID)
            .map(|(id, _)| id)
            .collect()
    }

    /// Controller chosen by the configured [`MasterPolicy`].
    pub fn master_controller_id(&self) -> Option<DeviceId> {
        let controllers: Vec<_> = self
            .present_by_arrival()
            .into_iter()
            .filter(|(id, _)| *id != SCREEN_DEVICE_ID)
            .collect();

        let master = match self.master_policy {
            MasterPolicy::ArrivalOrder => controllers.first(),
            MasterPolicy::PremiumFirst => controllers
                .iter()
                .find(|(_, e)| e.state.premium)
                .or(controllers.first()),
        };
        master.map(|(id, _)| *id)
    }

    pub(crate) fn require_screen(&self, operation: &'static str) -> Result<(), ClientError> {
        if self.role.is_screen() {
            Ok(())
        } else {
            Err(ClientError::PermissionDenied { operation })
        }
    }

    /// Replace the player slots (screen only).
    ///
    /// Gaps are dropped so player numbers stay consecutive. On error the
    /// previous slots are kept.
    pub fn set_active_slots(&mut self, slots: &[Option<DeviceId>]) -> Result<(), ClientError> {
        self.require_screen("set_active_slots")?;
        let slots = compact_slots(slots)?;
        debug!(?slots, "Active player slots assigned");
        self.slots = slots;
        Ok(())
    }

    /// Replace the player slots with an assignment relayed from the screen.
    pub fn apply_active_slots(&mut self, slots: &[Option<DeviceId>]) {
        match compact_slots(slots) {
            Ok(slots) => {
                debug!(?slots, "Active player slots relayed");
                self.slots = slots;
            }
            Err(e) => warn!("Ignoring relayed player slots: {}", e),
        }
    }

    fn slots(&self) -> &[DeviceId] {
        if self.is_ready() {
            &self.slots[..]
        } else {
            &[]
        }
    }

    /// Handles of the active players, indexed by player number.
    pub fn active_player_ids(&self) -> &[DeviceId] {
        self.slots()
    }

    /// Number of active players.
    pub fn player_count(&self) -> usize {
        self.slots().len()
    }

    /// Zero-based player number of a handle, if it holds a slot.
    pub fn device_to_player_number(&self, device_id: DeviceId) -> Option<usize> {
        self.slots().iter().position(|id| *id == device_id)
    }

    /// Handle holding the given player number.
    pub fn player_number_to_device(&self, player_number: usize) -> Option<DeviceId> {
        self.slots().get(player_number).copied()
    }

    /// Player number of the local device.
    pub fn own_player_number(&self) -> Option<usize> {
        self.own_device_id
            .and_then(|id| self.device_to_player_number(id))
    }

    /// Offset from local wall clock to server time, when time sync is on.
    pub fn server_time_offset_ms(&self) -> Option<i64> {
        self.server_time_offset_ms
    }

    /// Server time for a local wall-clock reading in milliseconds.
    pub fn server_time_at(&self, local_ms: i64) -> Option<i64> {
        self.server_time_offset_ms
            .map(|offset| local_ms.saturating_add(offset))
    }
}

fn compact_slots(slots: &[Option<DeviceId>]) -> Result<Vec<DeviceId>, ClientError> {
    let mut seen = HashSet::with_capacity(slots.len());
    let mut compacted = Vec::with_capacity(slots.len());
    for &device_id in slots.iter().flatten() {
        if !seen.insert(device_id) {
            return Err(ClientError::InvalidArgument(format!(
                "device {device_id} appears more than once in the player slots"
            )));
        }
        compacted.push(device_id);
    }
    Ok(compacted)
}
