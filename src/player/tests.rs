use std::time::Duration;

use serde_json::json;

use super::*;
use crate::{
    config::Timings,
    context::PendingCall,
    rpc::RpcError,
    scheduler::{ManualClock, Scheduler},
};

fn setup() -> (PlayerTracker, Context, ManualClock) {
    let clock = ManualClock::new();
    let cx = Context::new(Scheduler::new(clock.clone()), Timings::default());
    (PlayerTracker::new(&PlayerConfig::default()), cx, clock)
}

fn events(cx: &mut Context) -> Vec<Event> {
    std::iter::from_fn(|| cx.next_event()).collect()
}

fn methods(calls: &[PendingCall]) -> Vec<Method> {
    calls.iter().map(|c| c.call.method).collect()
}

fn ids(tracker: &PlayerTracker) -> Vec<PlayerId> {
    tracker.active_players().map(|p| p.id).collect()
}

fn status(speed: i64) -> Value {
    json!({
        "playlistid": 0,
        "speed": speed,
        "position": 2,
        "totaltime": {"hours": 0, "minutes": 3, "seconds": 30, "milliseconds": 0},
        "time": {"hours": 0, "minutes": 1, "seconds": 0, "milliseconds": 0},
        "percentage": 28.5,
        "canseek": true,
        "canrepeat": true,
        "canshuffle": true,
        "repeat": "all",
        "shuffled": false,
    })
}

/// A tracker following player 0 with the given speed
fn tracking(speed: i64) -> (PlayerTracker, Context, ManualClock) {
    let (mut tracker, mut cx, clock) = setup();
    tracker.handle_active_players(Ok(json!([{"playerid": 0, "type": "audio"}])), &mut cx);
    tracker.handle_player_status(0, Ok(status(speed)), &mut cx);
    events(&mut cx);
    cx.take_calls();
    (tracker, cx, clock)
}

#[test]
fn active_players_follow_latest_report() {
    let (mut tracker, mut cx, _) = setup();
    tracker.handle_active_players(
        Ok(json!([{"playerid": 0, "type": "audio"}, {"playerid": 1, "type": "video"}])),
        &mut cx,
    );
    assert_eq!(ids(&tracker), vec![0, 1]);

    tracker.handle_active_players(Ok(json!([{"playerid": 1, "type": "video"}])), &mut cx);
    assert_eq!(ids(&tracker), vec![1]);

    tracker.handle_active_players(Ok(json!([])), &mut cx);
    assert!(tracker.active_player(None).is_none());
}

#[test]
fn failed_poll_keeps_players() {
    let (mut tracker, mut cx, _) = setup();
    tracker.handle_active_players(Err(RpcError::Timeout), &mut cx);
    assert!(tracker.active_player(None).is_none());

    tracker.handle_active_players(Ok(json!([{"playerid": 2, "type": "picture"}])), &mut cx);
    tracker.handle_active_players(Err(RpcError::Timeout), &mut cx);
    assert_eq!(ids(&tracker), vec![2]);
    assert_eq!(
        events(&mut cx).last(),
        Some(&Event::ActivePlayersUpdated {
            status: Status::Error,
            data: Value::Null
        })
    );
}

#[test]
fn malformed_report_clears_players() {
    let (mut tracker, mut cx, _) = setup();
    tracker.handle_active_players(Ok(json!([{"playerid": 0, "type": "audio"}])), &mut cx);
    tracker.handle_active_players(Ok(Value::Null), &mut cx);
    assert!(tracker.active_player(None).is_none());
}

#[test]
fn merge_keeps_known_fields_and_last_state() {
    let (mut tracker, mut cx, _) = tracking(1);
    tracker.handle_active_players(Ok(json!([{"playerid": 0, "type": "audio"}])), &mut cx);
    tracker.handle_active_players(Ok(json!([{"playerid": 0, "type": "video"}])), &mut cx);

    let player = tracker.active_player(Some(0)).unwrap();
    assert_eq!(player.kind, PlayerKind::Video);
    assert!(player.is_playing);
    assert_eq!(player.playlist_id(), Some(0));
    let last = player.last_state.as_deref().unwrap();
    assert_eq!(last.kind, PlayerKind::Audio);
    assert!(last.last_state.is_none());
}

#[test]
fn speed_derives_playing_and_paused() {
    let (tracker, _, _) = tracking(0);
    let player = tracker.active_player(None).unwrap();
    assert!(player.is_paused);
    assert!(!player.is_playing);

    let (tracker, _, _) = tracking(5);
    let player = tracker.active_player(None).unwrap();
    assert!(player.is_playing);
    assert!(!player.is_paused);
    assert_eq!(player.position(), Some(2));
    let properties = player.properties.as_ref().unwrap();
    assert_eq!(properties.repeat, RepeatMode::All);
    assert_eq!(properties.total_time.as_secs(), 210);
}

#[test]
fn status_request_targets_player() {
    let (tracker, mut cx, _) = tracking(1);
    tracker.refresh_player_status(None, &mut cx);
    let calls = cx.take_calls();
    assert_eq!(calls.len(), 1);
    assert_eq!(calls[0].reply, Reply::PlayerStatus(0));
    assert_eq!(calls[0].call.method, Method::PlayerGetProperties);
    assert_eq!(calls[0].call.timeout, Some(Duration::from_millis(3000)));
    assert_eq!(calls[0].call.param("playerid"), Some(&json!(0)));

    tracker.refresh_player_status(Some(7), &mut cx);
    assert!(cx.take_calls().is_empty());
}

#[test]
fn failed_status_drops_player() {
    let (mut tracker, mut cx, _) = tracking(1);
    tracker.handle_player_status(0, Err(RpcError::Timeout), &mut cx);
    assert!(tracker.active_player(None).is_none());
    match events(&mut cx).as_slice() {
        [Event::PlayerStatusUpdated {
            status: Status::Error,
            player: Some(player),
            ..
        }] => assert_eq!(player.id, 0),
        other => panic!("unexpected events {other:?}"),
    }

    let (mut tracker, mut cx, _) = tracking(1);
    tracker.handle_player_status(0, Ok(Value::Null), &mut cx);
    assert!(tracker.active_player(None).is_none());
}

#[test]
fn active_players_reconciliation() {
    let (mut tracker, mut cx, _) = setup();
    tracker.handle_active_players(Ok(json!([{"playerid": 0, "type": "audio"}])), &mut cx);
    tracker.on_active_players_updated(Status::Success, &mut cx);
    assert!(cx.scheduler.is_pending(TimerKind::ActivePlayers));
    assert_eq!(methods(&cx.take_calls()), vec![Method::PlayerGetProperties]);

    // Status refresh already pending: no second request
    cx.scheduler.schedule(TimerKind::PlayerStatus, Duration::from_secs(1));
    tracker.on_active_players_updated(Status::Success, &mut cx);
    assert!(cx.take_calls().is_empty());

    tracker.handle_active_players(Ok(json!([])), &mut cx);
    tracker.on_active_players_updated(Status::Success, &mut cx);
    assert!(!cx.scheduler.is_pending(TimerKind::PlayerStatus));
    assert_eq!(cx.scheduler.pending(), 1);
}

#[test]
fn active_players_retry_delay() {
    let (tracker, mut cx, clock) = setup();
    tracker.on_active_players_updated(Status::Error, &mut cx);
    clock.advance(Duration::from_millis(4999));
    assert!(cx.scheduler.take_due().is_empty());
    clock.advance(Duration::from_millis(1));
    assert_eq!(cx.scheduler.take_due(), vec![TimerKind::ActivePlayers]);
}

#[test]
fn status_success_takes_priority() {
    let (mut tracker, mut cx, _) = tracking(1);
    cx.scheduler.schedule(TimerKind::ActivePlayers, Duration::from_secs(1));
    tracker.on_player_status_updated(Status::Success, &mut cx);
    assert!(!cx.scheduler.is_pending(TimerKind::ActivePlayers));
    assert!(cx.scheduler.is_pending(TimerKind::PlayerStatus));
    assert!(cx.take_calls().is_empty());
}

#[test]
fn status_error_triggers_rediscovery() {
    let (mut tracker, mut cx, _) = tracking(1);
    tracker.on_player_status_updated(Status::Error, &mut cx);
    assert_eq!(methods(&cx.take_calls()), vec![Method::PlayerGetActivePlayers]);

    cx.scheduler.schedule(TimerKind::ActivePlayers, Duration::from_secs(5));
    tracker.on_player_status_updated(Status::Error, &mut cx);
    assert!(cx.take_calls().is_empty());
}

#[test]
fn play_pause_while_playing_pauses() {
    let (mut tracker, mut cx, _) = tracking(1);
    tracker.play_pause(None, &mut cx);
    let calls = cx.take_calls();
    assert_eq!(calls.len(), 1);
    assert_eq!(calls[0].call.method, Method::PlayerPlayPause);
    assert_eq!(calls[0].call.param("play"), Some(&json!(false)));
    assert!(events(&mut cx).contains(&Event::Action(PlayerAction::Pause)));
}

#[test]
fn play_pause_while_paused_plays() {
    let (mut tracker, mut cx, _) = tracking(0);
    tracker.play_pause(None, &mut cx);
    let calls = cx.take_calls();
    assert_eq!(calls.len(), 1);
    assert_eq!(calls[0].call.param("play"), Some(&json!(true)));
    assert!(!events(&mut cx).contains(&Event::Action(PlayerAction::Pause)));
}

#[test]
fn actions_without_player_are_silent() {
    let (mut tracker, mut cx, _) = setup();
    tracker.play(None, &mut cx);
    tracker.stop(None, &mut cx);
    tracker.next(None, &mut cx);
    tracker.play_pause(None, &mut cx);
    assert!(cx.take_calls().is_empty());
    assert!(events(&mut cx).is_empty());

    let (mut tracker, mut cx, _) = tracking(1);
    tracker.stop(Some(3), &mut cx);
    assert!(cx.take_calls().is_empty());
}

#[test]
fn go_to_and_open() {
    let (mut tracker, mut cx, _) = tracking(1);
    tracker.previous(None, &mut cx);
    assert!(tracker.go_to(Some(0), GoTo::Position(4), &mut cx));
    tracker.open(json!({"playlistid": 0, "position": 1}), &mut cx);
    let calls = cx.take_calls();
    assert_eq!(
        methods(&calls),
        vec![Method::PlayerGoTo, Method::PlayerGoTo, Method::PlayerOpen]
    );
    assert_eq!(calls[0].call.param("to"), Some(&json!("previous")));
    assert_eq!(calls[1].call.param("to"), Some(&json!(4)));
    assert_eq!(calls[2].call.param("item"), Some(&json!({"playlistid": 0, "position": 1})));
    assert!(events(&mut cx).contains(&Event::Action(PlayerAction::Previous)));
}

#[test]
fn controls_follow_player() {
    let (mut tracker, mut cx, _) = setup();
    tracker.refresh_controls(&mut cx);
    assert!(ControlKind::ALL.iter().all(|c| tracker.controls().is_disabled(*c)));

    let (mut tracker, mut cx, _) = tracking(1);
    tracker.refresh_controls(&mut cx);
    let controls = tracker.controls();
    assert!(!controls.is_disabled(ControlKind::Stop));
    assert!(!controls.is_disabled(ControlKind::Pause));
    assert!(controls.is_disabled(ControlKind::Play));
    assert_eq!(controls.play_pause_class(), Some("playing"));

    tracker.handle_player_status(0, Ok(status(0)), &mut cx);
    tracker.refresh_controls(&mut cx);
    let controls = tracker.controls();
    assert!(!controls.is_disabled(ControlKind::Play));
    assert!(controls.is_disabled(ControlKind::Pause));
    assert_eq!(controls.play_pause_class(), Some("paused"));
}

#[test]
fn disabled_control_is_ignored() {
    let (mut tracker, mut cx, _) = tracking(1);
    tracker.refresh_controls(&mut cx);
    tracker.press(ControlKind::Play, &mut cx);
    assert!(cx.take_calls().is_empty());

    tracker.press(ControlKind::PlayPause, &mut cx);
    assert_eq!(methods(&cx.take_calls()), vec![Method::PlayerPlayPause]);
}

#[test]
fn lookup_by_kind() {
    let (mut tracker, mut cx, _) = setup();
    tracker.handle_active_players(
        Ok(json!([{"playerid": 0, "type": "audio"}, {"playerid": 2, "type": "picture"}])),
        &mut cx,
    );
    assert_eq!(tracker.active_player_by_kind(&PlayerKind::Picture).map(|p| p.id), Some(2));
    assert!(tracker.active_player_by_kind(&PlayerKind::Video).is_none());
}

#[test]
fn late_status_for_untracked_player_is_dropped() {
    let (mut tracker, mut cx, _) = tracking(1);
    tracker.handle_active_players(Ok(json!([{"playerid": 1, "type": "audio"}])), &mut cx);
    events(&mut cx);

    tracker.handle_player_status(0, Ok(status(1)), &mut cx);
    tracker.handle_player_status(0, Err(RpcError::Timeout), &mut cx);
    assert!(events(&mut cx).is_empty());
    assert_eq!(ids(&tracker), vec![1]);
}
