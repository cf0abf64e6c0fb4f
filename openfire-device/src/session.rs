//! Device session: the protocol state machine
//!
//! A `DeviceSession` owns the line channel to one board and the settings
//! model loaded from it. Every request/response exchange takes `&mut self`,
//! so only one request can ever be outstanding.
//!
//! ```text
//! Disconnected → Probing → Loading → Idle ⇄ Active
//!                                     ⇅
//!                                  TestMode
//! ```

use std::collections::BTreeSet;
use std::time::{Duration, Instant};

use openfire_transport::event_parser::notif;
use openfire_transport::protocol::{fields, reply, timing};
use openfire_transport::{
    parse_notification, parse_telemetry, split_fields, AnalogDirection, Command, FeatureTest,
    FieldMode, LineChannel, Notification, TelemetryFrame, TemperatureLevel, Transport,
    TransportDeviceInfo,
};
use serde::Serialize;
use tracing::{debug, info, warn};

use crate::board::{BoardType, PinFunction};
use crate::diff::FieldChange;
use crate::error::DeviceError;
use crate::pins::PinMap;
use crate::settings::{
    BoardIdentity, BoolSettings, CalibrationProfile, DeviceConfig, ProfileOffsets, SettingsModel,
    SettingsTable, UsbIdentity, PROFILE_COUNT,
};

/// Upper bound on ack lines tolerated between `XS` and the saving banner
const MAX_SAVE_PREAMBLE: usize = 64;

/// Quiet period that ends an undock drain early
const UNDOCK_QUIET: Duration = Duration::from_millis(250);

const PROFILE_STEPS: [&str; PROFILE_COUNT] = ["profile 0", "profile 1", "profile 2", "profile 3"];

/// Session timing and protocol options
#[derive(Debug, Clone)]
pub struct SessionConfig {
    pub probe_timeout: Duration,
    /// Bound on every load read and every commit acknowledgement
    pub read_timeout: Duration,
    pub identity_timeout: Duration,
    pub test_mode_timeout: Duration,
    pub clear_timeout: Duration,
    pub undock_drain: Duration,
    pub write_timeout: Duration,
    pub heartbeat_interval: Duration,
    /// Force a field mode; `None` negotiates it from the probe reply
    pub field_mode: Option<FieldMode>,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            probe_timeout: Duration::from_millis(timing::PROBE_TIMEOUT_MS),
            read_timeout: Duration::from_millis(timing::READ_TIMEOUT_MS),
            identity_timeout: Duration::from_millis(timing::IDENTITY_TIMEOUT_MS),
            test_mode_timeout: Duration::from_millis(timing::TEST_MODE_TIMEOUT_MS),
            clear_timeout: Duration::from_millis(timing::CLEAR_TIMEOUT_MS),
            undock_drain: Duration::from_millis(timing::UNDOCK_DRAIN_MS),
            write_timeout: Duration::from_millis(timing::WRITE_TIMEOUT_MS),
            heartbeat_interval: Duration::from_millis(timing::HEARTBEAT_INTERVAL_MS),
            field_mode: None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum ProtocolState {
    Disconnected,
    Probing,
    Loading,
    /// Connected; incoming lines are notifications
    Idle,
    /// A request/response exchange is in flight
    Active,
    /// Connected; incoming lines are tracking telemetry
    TestMode,
}

impl ProtocolState {
    fn describe(self) -> &'static str {
        match self {
            Self::Disconnected => "disconnected",
            Self::Probing => "probing",
            Self::Loading => "loading",
            Self::Idle => "idle",
            Self::Active => "busy",
            Self::TestMode => "in test mode",
        }
    }
}

/// Something the board reported on its own
#[derive(Debug, Clone, PartialEq, Serialize)]
pub enum SessionEvent {
    ButtonPressed(PinFunction),
    ButtonReleased(PinFunction),
    /// The board switched its active profile
    ProfileChanged(u8),
    /// A profile was recalibrated on the board
    ProfileUpdated { slot: u8, offsets: ProfileOffsets },
    Temperature { celsius: i32, level: TemperatureLevel },
    Analog(AnalogDirection),
    Telemetry(TelemetryFrame),
}

/// Connection to one OpenFIRE board
pub struct DeviceSession {
    channel: Option<LineChannel>,
    config: SessionConfig,
    state: ProtocolState,
    model: SettingsModel,
    pressed: BTreeSet<PinFunction>,
    temperature: Option<i32>,
    analog: AnalogDirection,
    last_heartbeat: Instant,
}

impl DeviceSession {
    /// A disconnected session
    pub fn new(config: SessionConfig) -> Self {
        Self {
            channel: None,
            config,
            state: ProtocolState::Disconnected,
            model: SettingsModel::default(),
            pressed: BTreeSet::new(),
            temperature: None,
            analog: AnalogDirection::Center,
            last_heartbeat: Instant::now(),
        }
    }

    /// Create a session and connect it in one step
    pub fn open(transport: Box<dyn Transport>, config: SessionConfig) -> Result<Self, DeviceError> {
        let mut session = Self::new(config);
        session.connect(transport)?;
        Ok(session)
    }

    // === Accessors ===

    pub fn state(&self) -> ProtocolState {
        self.state
    }

    pub fn is_connected(&self) -> bool {
        self.state != ProtocolState::Disconnected
    }

    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    pub fn model(&self) -> &SettingsModel {
        &self.model
    }

    pub fn identity(&self) -> &BoardIdentity {
        &self.model.identity
    }

    pub fn board(&self) -> BoardType {
        self.model.board()
    }

    pub fn device_info(&self) -> Option<&TransportDeviceInfo> {
        self.channel.as_ref().map(|c| c.device_info())
    }

    pub fn field_mode(&self) -> Option<FieldMode> {
        self.channel.as_ref().map(|c| c.field_mode())
    }

    /// Functions currently held down
    pub fn pressed(&self) -> impl Iterator<Item = PinFunction> + '_ {
        self.pressed.iter().copied()
    }

    pub fn is_pressed(&self, function: PinFunction) -> bool {
        self.pressed.contains(&function)
    }

    /// Last temperature reading, if any
    pub fn temperature(&self) -> Option<(i32, TemperatureLevel)> {
        self.temperature
            .map(|c| (c, TemperatureLevel::classify(c)))
    }

    pub fn analog(&self) -> AnalogDirection {
        self.analog
    }

    pub fn diff(&self) -> Vec<FieldChange> {
        self.model.diff()
    }

    pub fn diff_count(&self) -> usize {
        self.model.diff_count()
    }

    /// Exactly what `commit` would send, without sending it
    pub fn pending_writes(&self) -> Vec<Command> {
        self.model.commit_plan()
    }

    // === State helpers ===

    fn set_state(&mut self, state: ProtocolState) {
        if state != self.state {
            info!("Session {:?} -> {:?}", self.state, state);
            self.state = state;
        }
    }

    fn require_idle(&self, operation: &'static str) -> Result<(), DeviceError> {
        match self.state {
            ProtocolState::Idle => Ok(()),
            ProtocolState::Disconnected => Err(DeviceError::NotConnected),
            other => Err(DeviceError::InvalidState {
                operation,
                state: other.describe(),
            }),
        }
    }

    /// Run one exchange with the session marked Active
    ///
    /// The heartbeat is suspended for the duration and its interval restarts
    /// afterwards. A lost port tears the session down.
    fn with_active<T>(
        &mut self,
        f: impl FnOnce(&mut LineChannel, &SessionConfig) -> Result<T, DeviceError>,
    ) -> Result<T, DeviceError> {
        let resume = self.state;
        let channel = self.channel.as_mut().ok_or(DeviceError::NotConnected)?;
        self.state = ProtocolState::Active;
        let result = f(channel, &self.config);
        self.state = resume;
        self.last_heartbeat = Instant::now();

        if let Err(DeviceError::Transport(e)) = &result {
            if e.is_disconnect() {
                warn!("Lost connection: {}", e);
                self.teardown();
            }
        }
        result
    }

    /// Close the port and forget unsaved edits
    fn teardown(&mut self) {
        if let Some(mut channel) = self.channel.take() {
            if let Err(e) = channel.close() {
                debug!("Close failed: {}", e);
            }
        }
        self.model.revert();
        self.pressed.clear();
        self.temperature = None;
        self.analog = AnalogDirection::Center;
        self.set_state(ProtocolState::Disconnected);
    }

    // ========================================================================
    // Connect / load
    // ========================================================================

    /// Probe the board behind `transport`, read its identity and load its
    /// whole configuration
    ///
    /// Nothing is installed until every step succeeded. On failure the
    /// transport is closed and the session is left exactly as it was.
    pub fn connect(&mut self, transport: Box<dyn Transport>) -> Result<(), DeviceError> {
        if self.state != ProtocolState::Disconnected {
            return Err(DeviceError::InvalidState {
                operation: "connect",
                state: "already connected",
            });
        }

        let mut channel = LineChannel::new(transport).with_write_timeout(self.config.write_timeout);
        if let Some(mode) = self.config.field_mode {
            channel.set_field_mode(mode);
        }

        self.set_state(ProtocolState::Probing);
        let staged = self.stage(&mut channel);

        match staged {
            Ok((identity, config)) => {
                info!(
                    "Connected to {} (firmware {} {}), profile {}",
                    identity.board, identity.version, identity.codename, identity.selected_profile
                );
                self.model = SettingsModel::loaded(identity, config);
                self.channel = Some(channel);
                self.last_heartbeat = Instant::now();
                self.set_state(ProtocolState::Idle);
                Ok(())
            }
            Err(e) => {
                warn!("Connect failed: {}", e);
                if let Err(close) = channel.close() {
                    debug!("Close failed: {}", close);
                }
                self.set_state(ProtocolState::Disconnected);
                Err(e)
            }
        }
    }

    fn stage(
        &mut self,
        channel: &mut LineChannel,
    ) -> Result<(BoardIdentity, DeviceConfig), DeviceError> {
        let identity = probe(channel, &self.config)?;
        self.set_state(ProtocolState::Loading);
        let usb = read_usb_identity(channel, &self.config)?;
        let config = load_config(channel, &self.config, identity.board, usb)?;
        Ok((identity, config))
    }

    /// Re-read identity and configuration, discarding unsaved edits
    ///
    /// On failure the model is untouched and the session stays Idle.
    pub fn reload(&mut self) -> Result<(), DeviceError> {
        self.require_idle("reload")?;
        let board = self.board();
        let config = self.with_active(|channel, cfg| {
            let usb = read_usb_identity(channel, cfg)?;
            load_config(channel, cfg, board, usb)
        })?;
        self.model = SettingsModel::loaded(self.model.identity.clone(), config);
        info!("Reloaded configuration");
        Ok(())
    }

    // ========================================================================
    // Editing
    // ========================================================================

    /// Apply an edit to the current configuration
    pub fn edit<T>(
        &mut self,
        f: impl FnOnce(&mut SettingsModel) -> Result<T, DeviceError>,
    ) -> Result<T, DeviceError> {
        self.require_idle("edit settings")?;
        f(&mut self.model)
    }

    pub fn apply_usb_preset(&mut self, player: u8) -> Result<(), DeviceError> {
        self.edit(|m| m.apply_usb_preset(player))
    }

    pub fn set_usb_identity(
        &mut self,
        product_id: Option<&str>,
        product_name: Option<&str>,
    ) -> Result<(), DeviceError> {
        self.edit(|m| m.set_usb_identity(product_id, product_name))
    }

    /// Drop unsaved edits
    pub fn revert(&mut self) -> Result<(), DeviceError> {
        self.edit(|m| {
            m.revert();
            Ok(())
        })
    }

    // ========================================================================
    // Commit
    // ========================================================================

    /// Write the whole configuration to the board and save it
    ///
    /// Each write must be acknowledged before the next is sent. A rejected
    /// write stops the commit with `PartialCommit`; writes already
    /// acknowledged stay on the board and the shadow is left as it was, so
    /// the diff still reports them. With nothing pending nothing is sent.
    pub fn commit(&mut self) -> Result<(), DeviceError> {
        self.require_idle("commit")?;
        if !self.model.is_dirty() {
            debug!("No pending changes, skipping commit");
            return Ok(());
        }
        let plan = self.model.commit_plan();
        let Some((save, writes)) = plan.split_last() else {
            return Ok(());
        };

        info!("Committing {} writes", writes.len());
        self.with_active(|channel, cfg| {
            channel.send(&Command::PauseOutputs)?;
            channel.discard_input()?;

            let total = writes.len();
            for (acknowledged, command) in writes.iter().enumerate() {
                channel.send(command)?;
                match channel.read_line(cfg.read_timeout)? {
                    Some(line) if reply::is_ack(&line) => {}
                    other => {
                        return Err(DeviceError::PartialCommit {
                            acknowledged,
                            total,
                            command: command.to_wire(),
                            reply: other.unwrap_or_else(|| "no reply".to_string()),
                        });
                    }
                }
            }

            channel.send(save)?;
            await_save(channel, cfg)?;
            channel.discard_input()?;
            Ok(())
        })?;

        self.model.sync();
        info!("Settings saved");
        Ok(())
    }

    // ========================================================================
    // Device actions
    // ========================================================================

    /// Switch the board's active profile
    pub fn select_profile(&mut self, slot: u8) -> Result<(), DeviceError> {
        self.require_idle("select profile")?;
        if slot as usize >= PROFILE_COUNT {
            return Err(DeviceError::InvalidParameter(format!("profile slot {slot}")));
        }
        if slot == self.model.identity.selected_profile {
            debug!("Profile {} already active", slot);
            return Ok(());
        }
        self.with_active(|channel, _| Ok(channel.send(&Command::SelectProfile(slot))?))?;
        self.model.select_profile(slot)
    }

    /// Start on-device calibration of a profile
    ///
    /// The board runs calibration on its own and reports the new offsets with
    /// an `UpdatedProf` notification, which `poll` applies.
    pub fn calibrate(&mut self, slot: u8) -> Result<(), DeviceError> {
        self.require_idle("calibrate")?;
        if slot as usize >= PROFILE_COUNT {
            return Err(DeviceError::InvalidParameter(format!("profile slot {slot}")));
        }
        self.with_active(|channel, _| Ok(channel.send(&Command::Calibrate(slot))?))
    }

    /// Enter or leave IR test mode
    pub fn set_test_mode(&mut self, on: bool) -> Result<(), DeviceError> {
        match (on, self.state) {
            (true, ProtocolState::TestMode) | (false, ProtocolState::Idle) => Ok(()),
            (true, _) => {
                self.require_idle("enter test mode")?;
                self.with_active(|channel, cfg| {
                    channel.discard_input()?;
                    channel.send(&Command::ToggleTestMode)?;
                    expect_line(
                        channel,
                        "test mode",
                        reply::TEST_MODE_ENTERED,
                        cfg.test_mode_timeout,
                    )
                })?;
                self.pressed.clear();
                self.set_state(ProtocolState::TestMode);
                Ok(())
            }
            (false, ProtocolState::TestMode) => {
                self.with_active(|channel, _| {
                    channel.send(&Command::ToggleTestMode)?;
                    channel.discard_input()?;
                    Ok(())
                })?;
                self.set_state(ProtocolState::Idle);
                Ok(())
            }
            (false, _) => Err(DeviceError::NotConnected),
        }
    }

    /// Pulse one feedback device or light the status LED
    pub fn test_feature(&mut self, test: FeatureTest) -> Result<(), DeviceError> {
        self.require_idle("run feature test")?;
        let needs = match test {
            FeatureTest::LedRed => Some(PinFunction::LedRed),
            FeatureTest::LedGreen => Some(PinFunction::LedGreen),
            FeatureTest::LedBlue => Some(PinFunction::LedBlue),
            FeatureTest::Rumble | FeatureTest::Solenoid => None,
        };
        if let Some(function) = needs {
            if self.model.shadow.pins.pin_of(function).is_none() {
                return Err(DeviceError::NotSupported(format!(
                    "{} is not mapped on this board",
                    function
                )));
            }
        }
        self.with_active(|channel, _| Ok(channel.send(&Command::Test(test))?))
    }

    /// Erase everything the board has saved, then disconnect
    pub fn clear_storage(&mut self) -> Result<(), DeviceError> {
        self.require_idle("clear storage")?;
        self.with_active(|channel, cfg| {
            channel.discard_input()?;
            channel.send(&Command::ClearStorage)?;
            expect_line(channel, "clear storage", reply::CLEARED, cfg.clear_timeout)
        })?;
        info!("Board storage cleared");
        self.undock()
    }

    /// Tell the board the host is leaving and close the port
    pub fn undock(&mut self) -> Result<(), DeviceError> {
        if self.state == ProtocolState::Disconnected {
            return Ok(());
        }
        let in_test_mode = self.state == ProtocolState::TestMode;
        let result = self.with_active(|channel, cfg| {
            if in_test_mode {
                channel.send(&Command::ToggleTestMode)?;
            }
            channel.send(&Command::Undock)?;
            let leftover = channel.drain(UNDOCK_QUIET, cfg.undock_drain)?;
            if !leftover.is_empty() {
                debug!("Drained {} lines on undock", leftover.len());
            }
            Ok(())
        });
        self.teardown();
        result
    }

    /// Reboot the board into its UF2 bootloader; the port goes away
    pub fn reboot_to_bootloader(&mut self) -> Result<(), DeviceError> {
        self.require_idle("reboot to bootloader")?;
        let result = self.with_active(|channel, _| Ok(channel.send(&Command::Bootloader)?));
        self.teardown();
        result
    }

    // ========================================================================
    // Background activity
    // ========================================================================

    /// Send the keepalive if it is due
    ///
    /// # Returns
    /// `true` if a heartbeat went out. A failed write means the board is gone:
    /// the session disconnects and the error is returned.
    pub fn tick(&mut self, now: Instant) -> Result<bool, DeviceError> {
        if self.state != ProtocolState::Idle
            || now.saturating_duration_since(self.last_heartbeat) < self.config.heartbeat_interval
        {
            return Ok(false);
        }
        let Some(channel) = self.channel.as_mut() else {
            return Ok(false);
        };
        match channel.send(&Command::Heartbeat) {
            Ok(()) => {
                self.last_heartbeat = now;
                Ok(true)
            }
            Err(e) => {
                warn!("Board missed heartbeat, assuming it was disconnected: {}", e);
                self.teardown();
                Err(e.into())
            }
        }
    }

    /// Collect what the board sent on its own
    ///
    /// Waits up to `timeout` for the first line, then takes whatever else is
    /// already buffered. In Idle lines are notifications and are applied to
    /// the session; in TestMode they are telemetry. Unrecognized lines are
    /// dropped.
    pub fn poll(&mut self, timeout: Duration) -> Result<Vec<SessionEvent>, DeviceError> {
        let test_mode = match self.state {
            ProtocolState::Idle => false,
            ProtocolState::TestMode => true,
            ProtocolState::Disconnected => return Err(DeviceError::NotConnected),
            other => {
                return Err(DeviceError::InvalidState {
                    operation: "poll",
                    state: other.describe(),
                })
            }
        };

        let lines = match self.read_pending(timeout) {
            Ok(lines) => lines,
            Err(e) => {
                if e.is_disconnect() {
                    warn!("Lost connection: {}", e);
                    self.teardown();
                }
                return Err(e.into());
            }
        };

        let mut events = Vec::new();
        for line in lines {
            if test_mode {
                match parse_telemetry(&line) {
                    Some(frame) => events.push(SessionEvent::Telemetry(frame)),
                    None => debug!("Dropping malformed telemetry {:?}", line),
                }
                continue;
            }
            match parse_notification(&line) {
                Some(n) => {
                    if let Some(event) = self.apply_notification(n)? {
                        events.push(event);
                    }
                }
                None => debug!("Ignoring unsolicited line {:?}", line),
            }
        }
        Ok(events)
    }

    fn read_pending(
        &mut self,
        timeout: Duration,
    ) -> Result<Vec<String>, openfire_transport::TransportError> {
        let Some(channel) = self.channel.as_mut() else {
            return Ok(Vec::new());
        };
        let mut lines = Vec::new();
        let mut next = channel.read_line(timeout)?;
        while let Some(line) = next {
            // offsets after an update tag are read by apply_notification
            let is_update = line.starts_with(notif::UPDATED_PROFILE);
            lines.push(line);
            if is_update {
                break;
            }
            next = channel.poll_line()?;
        }
        Ok(lines)
    }

    fn apply_notification(
        &mut self,
        notification: Notification,
    ) -> Result<Option<SessionEvent>, DeviceError> {
        let event = match notification {
            Notification::ButtonPressed(id) => PinFunction::from_id(id).map(|f| {
                self.pressed.insert(f);
                SessionEvent::ButtonPressed(f)
            }),
            Notification::ButtonReleased(id) => PinFunction::from_id(id).map(|f| {
                self.pressed.remove(&f);
                SessionEvent::ButtonReleased(f)
            }),
            Notification::Temperature(celsius) => {
                self.temperature = Some(celsius);
                Some(SessionEvent::Temperature {
                    celsius,
                    level: TemperatureLevel::classify(celsius),
                })
            }
            Notification::Analog(direction) => {
                self.analog = direction;
                Some(SessionEvent::Analog(direction))
            }
            Notification::ProfileChanged(slot) => {
                self.model.select_profile(slot)?;
                Some(SessionEvent::ProfileChanged(slot))
            }
            Notification::ProfileUpdated(slot) => {
                self.read_updated_offsets(slot)?
                    .map(|offsets| SessionEvent::ProfileUpdated { slot, offsets })
            }
        };
        Ok(event)
    }

    /// Read the offset lines that follow `UpdatedProf:`; a short or garbled
    /// block is dropped without touching the model
    fn read_updated_offsets(&mut self, slot: u8) -> Result<Option<ProfileOffsets>, DeviceError> {
        let timeout = self.config.read_timeout;
        let result = self.with_active(|channel, _| {
            let mut values = Vec::with_capacity(fields::UPDATED_PROFILE);
            for _ in 0..fields::UPDATED_PROFILE {
                match channel.read_line(timeout)? {
                    Some(line) => values.push(line),
                    None => return Ok(None),
                }
            }
            Ok(Some(values))
        })?;

        let Some(values) = result else {
            warn!("Profile {} update ended early, ignoring it", slot);
            return Ok(None);
        };
        match ProfileOffsets::from_fields(&values) {
            Ok(offsets) => {
                self.model.select_profile(slot)?;
                self.model.update_offsets(slot, offsets)?;
                info!("Profile {} recalibrated", slot);
                Ok(Some(offsets))
            }
            Err(e) => {
                warn!("Ignoring profile {} update: {}", slot, e);
                Ok(None)
            }
        }
    }
}

impl Drop for DeviceSession {
    fn drop(&mut self) {
        if self.state != ProtocolState::Disconnected {
            if let Err(e) = self.undock() {
                debug!("Undock on drop failed: {}", e);
            }
        }
    }
}

// ============================================================================
// Exchange steps
// ============================================================================

fn probe(channel: &mut LineChannel, cfg: &SessionConfig) -> Result<BoardIdentity, DeviceError> {
    const STEP: &str = "probe";

    channel.discard_input()?;
    channel.send(&Command::Probe)?;
    let first = channel
        .read_line(cfg.probe_timeout)?
        .ok_or(DeviceError::Timeout { step: STEP })?;

    let mode = match cfg.field_mode {
        Some(mode) => mode,
        None if first.contains(',') => FieldMode::Comma,
        None if first == reply::PROBE_TOKEN => FieldMode::PerLine,
        None => return Err(DeviceError::malformed(STEP, first)),
    };
    channel.set_field_mode(mode);

    let values = match mode {
        FieldMode::Comma => split_fields(&first),
        FieldMode::PerLine => {
            let mut values = vec![first];
            while values.len() < fields::PROBE {
                let line = channel
                    .read_line(cfg.probe_timeout)?
                    .ok_or(DeviceError::Timeout { step: STEP })?;
                values.push(line);
            }
            values
        }
    };
    check_count(STEP, &values, fields::PROBE)?;

    if values[0] != reply::PROBE_TOKEN {
        return Err(DeviceError::malformed(STEP, values.join(",")));
    }
    let version: f32 = values[1]
        .parse()
        .map_err(|_| DeviceError::malformed(STEP, values.join(",")))?;
    let selected: u8 = values[4]
        .parse()
        .ok()
        .filter(|&s| (s as usize) < PROFILE_COUNT)
        .ok_or_else(|| DeviceError::malformed(STEP, values.join(",")))?;

    Ok(BoardIdentity {
        board: BoardType::from_token(&values[3]),
        version,
        codename: values[2].clone(),
        selected_profile: selected,
        previous_profile: selected,
    })
}

fn read_usb_identity(
    channel: &mut LineChannel,
    cfg: &SessionConfig,
) -> Result<UsbIdentity, DeviceError> {
    let values = read_fields(
        channel,
        &Command::ReadIdentity,
        "identity",
        fields::IDENTITY,
        cfg.identity_timeout,
    )?;
    let mut values = values.into_iter();
    let product_id = values.next().unwrap_or_default();
    let product_name = values
        .next()
        .filter(|name| name != reply::NAME_UNSET)
        .unwrap_or_default();
    Ok(UsbIdentity {
        product_id,
        product_name,
    })
}

/// The ordered load sequence; returns a complete configuration or nothing
fn load_config(
    channel: &mut LineChannel,
    cfg: &SessionConfig,
    board: BoardType,
    usb: UsbIdentity,
) -> Result<DeviceConfig, DeviceError> {
    let t = cfg.read_timeout;

    let values = read_fields(channel, &Command::ReadBools, "bools", fields::BOOLS, t)?;
    let bools = BoolSettings::from_fields(&values).map_err(|e| DeviceError::malformed("bools", e))?;

    let pins = if bools.custom_pins() {
        let values = read_fields(channel, &Command::ReadPins, "pins", fields::PINS, t)?;
        let wire = values
            .iter()
            .map(|v| v.parse::<i32>())
            .collect::<Result<Vec<_>, _>>()
            .map_err(|_| DeviceError::malformed("pins", values.join(",")))?;
        PinMap::from_wire(&wire).map_err(|e| DeviceError::malformed("pins", e))?
    } else {
        PinMap::from_layout(board.layout())
    };

    let values = read_fields(channel, &Command::ReadSettings, "settings", fields::SETTINGS, t)?;
    let settings =
        SettingsTable::from_fields(&values).map_err(|e| DeviceError::malformed("settings", e))?;

    let mut profiles: [CalibrationProfile; PROFILE_COUNT] = Default::default();
    for (slot, (profile, step)) in profiles.iter_mut().zip(PROFILE_STEPS).enumerate() {
        let values = read_fields(channel, &Command::ReadProfile(slot as u8), step, fields::PROFILE, t)?;
        *profile = CalibrationProfile::from_fields(&values).map_err(|e| DeviceError::malformed(step, e))?;
    }

    Ok(DeviceConfig {
        bools,
        pins,
        settings,
        profiles,
        usb,
    })
}

/// Send a read command and return its record, checked for field count
fn read_fields(
    channel: &mut LineChannel,
    command: &Command,
    step: &'static str,
    expected: usize,
    timeout: Duration,
) -> Result<Vec<String>, DeviceError> {
    let values = channel
        .query_record(command, expected, timeout)?
        .ok_or(DeviceError::Timeout { step })?;
    if channel.field_mode() == FieldMode::PerLine && values.len() < expected {
        return Err(DeviceError::Timeout { step });
    }
    check_count(step, &values, expected)?;
    Ok(values)
}

fn check_count(step: &'static str, values: &[String], expected: usize) -> Result<(), DeviceError> {
    if values.len() != expected {
        return Err(DeviceError::FieldCount {
            step,
            expected,
            actual: values.len(),
        });
    }
    Ok(())
}

/// Wait for a line starting with `expected`, skipping notifications
fn expect_line(
    channel: &mut LineChannel,
    step: &'static str,
    expected: &str,
    timeout: Duration,
) -> Result<(), DeviceError> {
    let deadline = Instant::now() + timeout;
    loop {
        let remaining = deadline.saturating_duration_since(Instant::now());
        let Some(line) = channel.read_line(remaining)? else {
            return Err(DeviceError::Timeout { step });
        };
        if line.starts_with(expected) {
            return Ok(());
        }
        if parse_notification(&line).is_some() {
            debug!("Skipping {:?} while waiting for {}", line, step);
            continue;
        }
        return Err(DeviceError::malformed(step, line));
    }
}

/// After `XS`: skip trailing acks, expect the saving banner, then allow a
/// few reads for the confirmation
fn await_save(channel: &mut LineChannel, cfg: &SessionConfig) -> Result<(), DeviceError> {
    let mut banner = false;
    for _ in 0..MAX_SAVE_PREAMBLE {
        let line = channel
            .read_line(cfg.read_timeout)?
            .ok_or(DeviceError::Timeout { step: "save" })?;
        if reply::is_ack(&line) {
            continue;
        }
        if line.starts_with(reply::SAVING) {
            banner = true;
            break;
        }
        return Err(DeviceError::malformed("save", line));
    }
    if !banner {
        return Err(DeviceError::Timeout { step: "save" });
    }

    for _ in 0..timing::SAVE_CONFIRM_ATTEMPTS {
        match channel.read_line(cfg.read_timeout)? {
            Some(line) if line.starts_with(reply::SAVED) => {
                debug!("{}", line);
                return Ok(());
            }
            Some(line) => debug!("Waiting for save confirmation, got {:?}", line),
            None => {}
        }
    }
    Err(DeviceError::Timeout {
        step: "save confirmation",
    })
}
