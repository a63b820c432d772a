use crate::player::autohide::AutoHide;
use crate::player::backend::{MediaBackend, MediaEvent};
use crate::player::keys::{Key, KeyAction};
use crate::player::state::{ControlError, Phase, PlaybackRate, PlaybackState};
use crate::timefmt::format_time;
use log::{debug, error, info, warn};
use std::time::Duration;
use tokio::time::Instant;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Settings {
    pub autohide: Duration,
    pub volume: f64,
    pub seek_step: f64,
    pub volume_step: f64,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            autohide: Duration::from_millis(crate::config::DEFAULT_AUTOHIDE_MS),
            volume: 1.0,
            seek_step: crate::config::DEFAULT_SEEK_STEP,
            volume_step: crate::config::DEFAULT_VOLUME_STEP,
        }
    }
}

/// Clamps a configured volume into `[0, 1]`; non-finite values fall back to
/// full volume.
pub fn initial_volume(volume: f64) -> f64 {
    if volume.is_finite() {
        volume.clamp(0.0, 1.0)
    } else {
        warn!("Ignoring invalid initial volume {}", volume);
        1.0
    }
}

/// Mirrors a media backend into a [`PlaybackState`] and forwards user
/// commands to it. Backend failures never escape: they are logged and the
/// state keeps its last good value.
pub struct Controller<B: MediaBackend> {
    backend: B,
    state: PlaybackState,
    autohide: AutoHide,
    settings: Settings,
    started: bool,
}

impl<B: MediaBackend> Controller<B> {
    pub fn mount(mut backend: B, source: &str, settings: Settings) -> Self {
        let mut state = PlaybackState {
            phase: Phase::Loading,
            source: Some(source.to_string()),
            is_loading: true,
            volume: initial_volume(settings.volume),
            ..PlaybackState::default()
        };

        if let Err(e) = backend.load(source) {
            error!("Failed to load {}: {}", source, e);
            state.phase = Phase::Failed;
            state.is_loading = false;
            state.error = Some(e.to_string());
        } else if let Err(e) = backend.set_volume(state.volume) {
            warn!("Failed to apply initial volume: {}", e);
        }
        info!("Mounted player for {}", source);

        Self {
            backend,
            state,
            autohide: AutoHide::new(settings.autohide),
            settings,
            started: false,
        }
    }

    pub fn state(&self) -> &PlaybackState {
        &self.state
    }

    pub fn autohide_deadline(&self) -> Option<Instant> {
        self.autohide.deadline()
    }

    fn is_mounted(&self) -> bool {
        self.state.phase != Phase::Unmounted
    }

    fn accepts_playback(&self) -> bool {
        !matches!(self.state.phase, Phase::Unmounted | Phase::Failed)
    }

    fn settle_phase(&mut self) {
        if !self.accepts_playback() {
            return;
        }
        self.state.phase = if self.state.is_loading {
            Phase::Loading
        } else if self.state.is_playing {
            Phase::Playing
        } else if self.started {
            Phase::Paused
        } else {
            Phase::Ready
        };
    }

    fn show_controls(&mut self) {
        self.state.controls_visible = true;
        self.autohide.cancel();
    }

    pub fn play(&mut self) {
        if !self.accepts_playback() || self.state.is_playing {
            return;
        }
        match self.backend.play() {
            Ok(()) => {
                self.state.is_playing = true;
                self.started = true;
                self.autohide.reset(Instant::now(), true);
            }
            Err(e) => {
                warn!("Play request failed, staying paused: {}", e);
                self.state.is_playing = false;
            }
        }
        self.settle_phase();
    }

    pub fn pause(&mut self) {
        if !self.accepts_playback() || !self.state.is_playing {
            return;
        }
        match self.backend.pause() {
            Ok(()) => {
                self.state.is_playing = false;
                self.show_controls();
                self.settle_phase();
            }
            Err(e) => warn!("Pause request failed: {}", e),
        }
    }

    pub fn toggle_play(&mut self) {
        if self.state.is_playing {
            self.pause();
        } else {
            self.play();
        }
    }

    pub fn seek(&mut self, time: f64) -> Result<(), ControlError> {
        if !time.is_finite() {
            return Err(ControlError::InvalidSeek(time));
        }
        if !self.is_mounted() {
            return Ok(());
        }
        let target = self.state.clamp_time(time);
        match self.backend.seek(target) {
            Ok(()) => {
                debug!("Seek to {}", format_time(target));
                self.state.current_time = target;
            }
            Err(e) => warn!("Seek to {:.3}s failed: {}", target, e),
        }
        Ok(())
    }

    pub fn seek_by(&mut self, delta: f64) -> Result<(), ControlError> {
        if !delta.is_finite() {
            return Err(ControlError::InvalidSeek(delta));
        }
        self.seek(self.state.current_time + delta)
    }

    pub fn set_volume(&mut self, volume: f64) -> Result<(), ControlError> {
        if volume.is_nan() {
            return Err(ControlError::InvalidVolume(volume));
        }
        if !self.is_mounted() {
            return Ok(());
        }
        let volume = volume.clamp(0.0, 1.0);
        if let Err(e) = self.backend.set_volume(volume) {
            warn!("Failed to set volume: {}", e);
            return Ok(());
        }
        self.state.volume = volume;
        if volume > 0.0 && self.state.is_muted {
            match self.backend.set_muted(false) {
                Ok(()) => self.state.is_muted = false,
                Err(e) => warn!("Failed to unmute: {}", e),
            }
        }
        Ok(())
    }

    pub fn toggle_mute(&mut self) {
        if !self.is_mounted() {
            return;
        }
        let muted = !self.state.is_muted;
        match self.backend.set_muted(muted) {
            Ok(()) => self.state.is_muted = muted,
            Err(e) => warn!("Failed to toggle mute: {}", e),
        }
    }

    pub fn set_playback_rate(&mut self, rate: f64) -> Result<(), ControlError> {
        let rate = PlaybackRate::try_from(rate)?;
        if !self.is_mounted() || rate == self.state.playback_rate {
            return Ok(());
        }
        match self.backend.set_rate(rate) {
            Ok(()) => {
                info!("Playback rate set to {}", rate);
                self.state.playback_rate = rate;
            }
            Err(e) => warn!("Failed to change playback rate: {}", e),
        }
        Ok(())
    }

    pub fn toggle_fullscreen(&mut self) {
        if !self.is_mounted() {
            return;
        }
        let fullscreen = !self.state.is_fullscreen;
        match self.backend.set_fullscreen(fullscreen) {
            Ok(()) => self.state.is_fullscreen = fullscreen,
            Err(e) => warn!("Error toggling fullscreen: {}", e),
        }
    }

    pub fn pointer_moved(&mut self) {
        if !self.is_mounted() {
            return;
        }
        self.state.controls_visible = true;
        self.autohide.reset(Instant::now(), self.state.is_playing);
    }

    pub fn pointer_left(&mut self) {
        if self.state.is_playing {
            self.state.controls_visible = false;
            self.autohide.cancel();
        }
    }

    /// Hides the controls once the inactivity deadline has passed.
    pub fn poll_autohide(&mut self) -> bool {
        if self.autohide.expired(Instant::now()) && self.state.is_playing {
            self.state.controls_visible = false;
            return true;
        }
        false
    }

    pub fn handle_key(&mut self, key: Key) {
        let result = match key.action() {
            KeyAction::TogglePlay => {
                self.toggle_play();
                Ok(())
            }
            KeyAction::ToggleFullscreen => {
                self.toggle_fullscreen();
                Ok(())
            }
            KeyAction::ToggleMute => {
                self.toggle_mute();
                Ok(())
            }
            KeyAction::SeekBackward => self.seek_by(-self.settings.seek_step),
            KeyAction::SeekForward => self.seek_by(self.settings.seek_step),
            KeyAction::VolumeUp => self.set_volume(self.state.volume + self.settings.volume_step),
            KeyAction::VolumeDown => {
                self.set_volume(self.state.volume - self.settings.volume_step)
            }
        };
        if let Err(e) = result {
            warn!("Rejected {:?} shortcut: {}", key, e);
        }
    }

    pub fn handle_event(&mut self, event: MediaEvent) {
        if !self.is_mounted() {
            debug!("Ignoring {:?} after unmount", event);
            return;
        }
        match event {
            MediaEvent::DurationChanged(duration) => {
                if duration.is_finite() && duration > 0.0 {
                    self.state.duration = duration;
                    self.state.current_time = self.state.clamp_time(self.state.current_time);
                }
            }
            MediaEvent::TimeUpdate(time) => {
                if time.is_finite() {
                    self.state.current_time = self.state.clamp_time(time);
                }
            }
            MediaEvent::Progress(ranges) => self.state.update_buffered(&ranges),
            MediaEvent::Waiting | MediaEvent::Stalled => {
                debug!("Video stalled, buffering");
                self.state.is_loading = true;
                self.settle_phase();
            }
            MediaEvent::LoadedData | MediaEvent::CanPlay | MediaEvent::CanPlayThrough => {
                self.state.is_loading = false;
                self.settle_phase();
            }
            MediaEvent::Playing => {
                self.state.is_playing = true;
                self.started = true;
                self.settle_phase();
            }
            MediaEvent::Paused | MediaEvent::Ended => {
                self.state.is_playing = false;
                self.show_controls();
                self.settle_phase();
            }
            MediaEvent::FullscreenChanged(fullscreen) => self.state.is_fullscreen = fullscreen,
            MediaEvent::Error(message) => {
                error!("Media error: {}", message);
                self.state.phase = Phase::Failed;
                self.state.is_loading = false;
                self.state.is_playing = false;
                self.state.error = Some(message);
                self.show_controls();
            }
        }
    }

    /// Terminal: releases the backend and drops the pending hide deadline.
    pub fn unmount(&mut self) {
        if !self.is_mounted() {
            return;
        }
        self.backend.release();
        self.autohide.cancel();
        self.state.phase = Phase::Unmounted;
        self.state.is_playing = false;
        self.state.is_loading = false;
        info!("Player unmounted");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::player::backend::fake::{Call, FakeBackend};

    fn mounted() -> (Controller<FakeBackend>, FakeBackend) {
        let backend = FakeBackend::default();
        let mut controller =
            Controller::mount(backend.clone(), "https://example.com/reel.mp4", Settings::default());
        controller.handle_event(MediaEvent::DurationChanged(120.0));
        controller.handle_event(MediaEvent::CanPlay);
        (controller, backend)
    }

    #[test]
    fn mount_loads_source_and_starts_loading() {
        let backend = FakeBackend::default();
        let controller = Controller::mount(backend.clone(), "file:///tmp/a.mp4", Settings::default());
        assert_eq!(controller.state().phase, Phase::Loading);
        assert!(controller.state().is_loading);
        assert!(controller.state().duration.is_nan());
        assert_eq!(
            backend.calls(),
            vec![Call::Load("file:///tmp/a.mp4".into()), Call::SetVolume(1.0)]
        );
    }

    #[test]
    fn can_play_settles_to_ready() {
        let (controller, _) = mounted();
        assert_eq!(controller.state().phase, Phase::Ready);
        assert!(!controller.state().is_loading);
    }

    #[test]
    fn seek_past_end_clamps_to_duration() {
        let (mut controller, backend) = mounted();
        controller.seek(150.0).unwrap();
        assert!((controller.state().current_time - 120.0).abs() < f64::EPSILON);
        assert_eq!(backend.calls().last(), Some(&Call::Seek(120.0)));

        controller.seek(-10.0).unwrap();
        assert!(controller.state().current_time.abs() < f64::EPSILON);
    }

    #[test]
    fn seek_rejects_non_finite_targets() {
        let (mut controller, _) = mounted();
        assert!(matches!(
            controller.seek(f64::NAN),
            Err(ControlError::InvalidSeek(_))
        ));
        assert!(controller.seek(f64::INFINITY).is_err());
        assert!(controller.state().current_time.abs() < f64::EPSILON);
    }

    #[test]
    fn failed_seek_keeps_position() {
        let (mut controller, backend) = mounted();
        controller.handle_event(MediaEvent::TimeUpdate(30.0));
        backend.script.lock().unwrap().reject_seek = true;
        controller.seek(60.0).unwrap();
        assert!((controller.state().current_time - 30.0).abs() < f64::EPSILON);
    }

    #[test]
    fn time_update_reconciles_optimistic_seek() {
        let (mut controller, _) = mounted();
        controller.seek(40.0).unwrap();
        controller.handle_event(MediaEvent::TimeUpdate(39.5));
        assert!((controller.state().current_time - 39.5).abs() < f64::EPSILON);
    }

    #[test]
    fn negative_volume_clamps_to_zero() {
        let (mut controller, _) = mounted();
        controller.set_volume(-0.5).unwrap();
        assert!(controller.state().volume.abs() < f64::EPSILON);
        controller.set_volume(3.0).unwrap();
        assert!((controller.state().volume - 1.0).abs() < f64::EPSILON);
        assert!(controller.set_volume(f64::NAN).is_err());
    }

    #[test]
    fn audible_volume_clears_mute() {
        let (mut controller, backend) = mounted();
        controller.toggle_mute();
        assert!(controller.state().is_muted);

        controller.set_volume(0.0).unwrap();
        assert!(controller.state().is_muted);

        controller.set_volume(0.4).unwrap();
        assert!(!controller.state().is_muted);
        assert_eq!(backend.calls().last(), Some(&Call::SetMuted(false)));
    }

    #[test]
    fn unmute_at_zero_volume_clears_flag() {
        let (mut controller, _) = mounted();
        controller.set_volume(0.0).unwrap();
        controller.toggle_mute();
        controller.toggle_mute();
        assert!(!controller.state().is_muted);
        assert!(controller.state().volume.abs() < f64::EPSILON);
    }

    #[test]
    fn rate_outside_menu_is_rejected() {
        let (mut controller, backend) = mounted();
        assert_eq!(
            controller.set_playback_rate(3.0),
            Err(ControlError::InvalidRate(3.0))
        );
        assert_eq!(controller.state().playback_rate, PlaybackRate::Normal);

        controller.set_playback_rate(2.0).unwrap();
        assert_eq!(controller.state().playback_rate, PlaybackRate::Double);
        assert_eq!(backend.calls().last(), Some(&Call::SetRate(PlaybackRate::Double)));
    }

    #[test]
    fn toggling_twice_from_paused_ends_paused() {
        let (mut controller, backend) = mounted();
        controller.toggle_play();
        assert!(controller.state().is_playing);
        controller.toggle_play();
        assert!(!controller.state().is_playing);
        assert_eq!(controller.state().phase, Phase::Paused);

        let calls = backend.calls();
        assert_eq!(&calls[calls.len() - 2..], &[Call::Play, Call::Pause]);
    }

    #[test]
    fn play_is_noop_when_already_playing() {
        let (mut controller, backend) = mounted();
        controller.play();
        controller.play();
        let plays = backend.calls().iter().filter(|c| **c == Call::Play).count();
        assert_eq!(plays, 1);
    }

    #[test]
    fn rejected_play_falls_back_to_paused() {
        let (mut controller, backend) = mounted();
        backend.script.lock().unwrap().reject_play = true;
        controller.play();
        assert!(!controller.state().is_playing);
        assert_eq!(controller.state().phase, Phase::Ready);
    }

    #[test]
    fn failed_fullscreen_leaves_state_unchanged() {
        let (mut controller, backend) = mounted();
        backend.script.lock().unwrap().reject_fullscreen = true;
        controller.toggle_fullscreen();
        assert!(!controller.state().is_fullscreen);

        backend.script.lock().unwrap().reject_fullscreen = false;
        controller.toggle_fullscreen();
        assert!(controller.state().is_fullscreen);
        controller.handle_event(MediaEvent::FullscreenChanged(false));
        assert!(!controller.state().is_fullscreen);
    }

    #[test]
    fn stall_reenters_loading_until_can_play() {
        let (mut controller, _) = mounted();
        controller.play();
        controller.handle_event(MediaEvent::Stalled);
        assert!(controller.state().is_loading);
        assert_eq!(controller.state().phase, Phase::Loading);

        controller.handle_event(MediaEvent::CanPlayThrough);
        assert!(!controller.state().is_loading);
        assert_eq!(controller.state().phase, Phase::Playing);
    }

    #[test]
    fn media_error_fails_the_view() {
        let (mut controller, backend) = mounted();
        controller.handle_event(MediaEvent::Error("decode error".into()));
        assert_eq!(controller.state().phase, Phase::Failed);
        assert_eq!(controller.state().error.as_deref(), Some("decode error"));

        controller.play();
        assert!(!backend.calls().contains(&Call::Play));
    }

    #[test]
    fn ended_shows_controls() {
        let (mut controller, _) = mounted();
        controller.play();
        controller.pointer_left();
        assert!(!controller.state().controls_visible);
        controller.handle_event(MediaEvent::Ended);
        assert!(controller.state().controls_visible);
        assert_eq!(controller.state().phase, Phase::Paused);
    }

    #[test]
    fn duration_change_reclamps_position() {
        let (mut controller, _) = mounted();
        controller.handle_event(MediaEvent::TimeUpdate(100.0));
        controller.handle_event(MediaEvent::DurationChanged(90.0));
        assert!((controller.state().current_time - 90.0).abs() < f64::EPSILON);
        controller.handle_event(MediaEvent::DurationChanged(f64::NAN));
        assert!((controller.state().duration - 90.0).abs() < f64::EPSILON);
    }

    #[test]
    fn progress_updates_buffered_fraction() {
        let (mut controller, _) = mounted();
        controller.handle_event(MediaEvent::Progress(vec![(0.0, 30.0)]));
        assert!((controller.state().buffered_fraction - 0.25).abs() < 1e-9);
        assert!((controller.state().buffer_health - 30.0).abs() < 1e-9);
    }

    #[test]
    fn keys_drive_commands() {
        let (mut controller, _) = mounted();
        controller.handle_key(Key::ArrowRight);
        assert!((controller.state().current_time - 5.0).abs() < f64::EPSILON);
        controller.handle_key(Key::ArrowLeft);
        controller.handle_key(Key::ArrowLeft);
        assert!(controller.state().current_time.abs() < f64::EPSILON);

        controller.handle_key(Key::ArrowDown);
        assert!((controller.state().volume - 0.9).abs() < 1e-9);
        controller.handle_key(Key::ArrowUp);
        controller.handle_key(Key::ArrowUp);
        assert!((controller.state().volume - 1.0).abs() < f64::EPSILON);

        controller.handle_key(Key::M);
        assert!(controller.state().is_muted);
        controller.handle_key(Key::Space);
        assert!(controller.state().is_playing);
    }

    #[test]
    fn non_finite_initial_volume_falls_back_to_full() {
        let settings = Settings {
            volume: f64::NAN,
            ..Settings::default()
        };
        let backend = FakeBackend::default();
        let controller = Controller::mount(backend.clone(), "a.mp4", settings);
        assert!((controller.state().volume - 1.0).abs() < f64::EPSILON);
        assert_eq!(backend.calls()[1], Call::SetVolume(1.0));

        let quiet = Controller::mount(
            FakeBackend::default(),
            "a.mp4",
            Settings {
                volume: -2.0,
                ..Settings::default()
            },
        );
        assert!(quiet.state().volume.abs() < f64::EPSILON);
    }

    #[test]
    fn rejected_shortcut_leaves_state_and_backend_alone() {
        let backend = FakeBackend::default();
        let settings = Settings {
            seek_step: f64::NAN,
            ..Settings::default()
        };
        let mut controller = Controller::mount(backend.clone(), "a.mp4", settings);
        controller.handle_event(MediaEvent::DurationChanged(120.0));
        controller.handle_key(Key::ArrowRight);
        assert!(controller.state().current_time.abs() < f64::EPSILON);
        assert!(!backend.calls().iter().any(|c| matches!(c, Call::Seek(_))));
    }

    #[tokio::test(start_paused = true)]
    async fn controls_hide_after_inactivity_while_playing() {
        let (mut controller, _) = mounted();
        controller.play();
        controller.pointer_moved();
        assert!(controller.state().controls_visible);

        tokio::time::advance(Duration::from_millis(2999)).await;
        assert!(!controller.poll_autohide());
        assert!(controller.state().controls_visible);

        tokio::time::advance(Duration::from_millis(1)).await;
        assert!(controller.poll_autohide());
        assert!(!controller.state().controls_visible);

        controller.pointer_moved();
        assert!(controller.state().controls_visible);
    }

    #[tokio::test(start_paused = true)]
    async fn controls_stay_visible_while_paused() {
        let (mut controller, _) = mounted();
        controller.pointer_moved();
        tokio::time::advance(Duration::from_millis(5000)).await;
        assert!(!controller.poll_autohide());
        assert!(controller.state().controls_visible);
    }

    #[tokio::test(start_paused = true)]
    async fn activity_postpones_hide() {
        let (mut controller, _) = mounted();
        controller.play();
        tokio::time::advance(Duration::from_millis(2000)).await;
        controller.pointer_moved();
        tokio::time::advance(Duration::from_millis(2000)).await;
        assert!(!controller.poll_autohide());
        tokio::time::advance(Duration::from_millis(1000)).await;
        assert!(controller.poll_autohide());
    }

    #[test]
    fn unmount_releases_and_ignores_later_events() {
        let (mut controller, backend) = mounted();
        controller.play();
        controller.unmount();
        assert_eq!(controller.state().phase, Phase::Unmounted);
        assert!(controller.autohide_deadline().is_none());
        assert_eq!(backend.calls().last(), Some(&Call::Release));

        controller.handle_event(MediaEvent::Playing);
        controller.play();
        controller.unmount();
        assert!(!controller.state().is_playing);
        let releases = backend.calls().iter().filter(|c| **c == Call::Release).count();
        assert_eq!(releases, 1);
    }
}
