//! Facade lifecycle: both-or-neither arming, teardown guarantees, and the
//! trampoline path the disk-arbitration subsystem drives.
//!
//! These tests arm the process-wide trampoline slot, so they run serially.

mod common;

use std::path::PathBuf;
use std::sync::atomic::Ordering;
use std::sync::Arc;

use cloudfence_core::{BlockLevel, PolicyMap, ProviderKind};
use cloudfence_daemon::channel::EventChannel;
use cloudfence_daemon::daemon::{Daemon, InitError};
use cloudfence_daemon::disk::{trampoline, DiskArbiter, DiskDescriptor};
use cloudfence_daemon::roots::FixedRoots;
use serial_test::serial;

use common::{RecordingArbiter, RecordingChannel};

fn fixed_roots() -> Box<FixedRoots> {
    Box::new(FixedRoots::new().with(ProviderKind::ICloud, vec![PathBuf::from("/icloud")]))
}

fn usb_stick() -> DiskDescriptor {
    DiskDescriptor {
        device: "disk3s1".to_string(),
        name: Some("USB STICK".to_string()),
        removable: true,
        ejectable: true,
    }
}

#[test]
#[serial]
fn init_arms_both_subsystems() {
    let channel = Arc::new(RecordingChannel::new());
    let arbiter = Arc::new(RecordingArbiter::new());
    let daemon = Daemon::new(
        Arc::clone(&channel) as Arc<dyn EventChannel>,
        Arc::clone(&arbiter) as Arc<dyn DiskArbiter>,
        fixed_roots(),
    );

    daemon.init().unwrap();
    assert!(channel.subscribed.lock().unwrap().is_some());
    assert!(arbiter.registration().is_some());

    daemon.uninit();
    assert!(channel.unsubscribed.load(Ordering::SeqCst));
    assert!(arbiter.closed.load(Ordering::SeqCst));
}

#[test]
#[serial]
fn failed_channel_init_leaves_disks_unarmed() {
    let channel = Arc::new(RecordingChannel::failing_subscribe());
    let arbiter = Arc::new(RecordingArbiter::new());
    let daemon = Daemon::new(
        Arc::clone(&channel) as Arc<dyn EventChannel>,
        Arc::clone(&arbiter) as Arc<dyn DiskArbiter>,
        fixed_roots(),
    );

    let err = daemon.init().unwrap_err();
    assert!(matches!(err, InitError::Channel(_)));
    assert!(arbiter.registration().is_none());
}

#[test]
#[serial]
fn failed_disk_init_disarms_the_engine() {
    let channel = Arc::new(RecordingChannel::new());
    let arbiter = Arc::new(RecordingArbiter::failing_open());
    let daemon = Daemon::new(
        Arc::clone(&channel) as Arc<dyn EventChannel>,
        Arc::clone(&arbiter) as Arc<dyn DiskArbiter>,
        fixed_roots(),
    );

    let err = daemon.init().unwrap_err();
    assert!(matches!(err, InitError::DiskArbitration(_)));
    // The engine was armed first and must be disarmed again.
    assert!(channel.unsubscribed.load(Ordering::SeqCst));
}

#[test]
#[serial]
fn registered_callbacks_reach_the_controller_and_update_stats() {
    let channel = Arc::new(RecordingChannel::new());
    let arbiter = Arc::new(RecordingArbiter::new());
    let daemon = Daemon::new(
        Arc::clone(&channel) as Arc<dyn EventChannel>,
        Arc::clone(&arbiter) as Arc<dyn DiskArbiter>,
        fixed_roots(),
    );
    daemon.init().unwrap();

    let (context, callbacks) = arbiter.registration().unwrap();
    let disk = usb_stick();

    let dissent = (callbacks.probe)(context, &disk);
    assert!(dissent.is_some());
    (callbacks.added)(context, &disk);
    (callbacks.renamed)(context, &disk, "BACKUP");
    (callbacks.removed)(context, &disk);

    let stats = daemon.disks().print_stats();
    assert_eq!(stats.blocked, 1);
    assert_eq!(stats.connected, 1);
    assert_eq!(stats.renamed, 1);
    assert_eq!(stats.removed, 1);

    daemon.uninit();
}

#[test]
#[serial]
fn stale_context_after_uninit_resolves_to_nothing() {
    let channel = Arc::new(RecordingChannel::new());
    let arbiter = Arc::new(RecordingArbiter::new());
    let daemon = Daemon::new(
        Arc::clone(&channel) as Arc<dyn EventChannel>,
        Arc::clone(&arbiter) as Arc<dyn DiskArbiter>,
        fixed_roots(),
    );
    daemon.init().unwrap();

    let (context, callbacks) = arbiter.registration().unwrap();
    daemon.uninit();

    assert!(trampoline::resolve(context).is_none());
    // A straggling probe is dropped (allowed), never a dangling decision.
    assert!((callbacks.probe)(context, &usb_stick()).is_none());
    assert_eq!(daemon.disks().print_stats().blocked, 0);
}

#[test]
#[serial]
fn second_controller_cannot_arm_while_one_is_active() {
    let daemon_a = Daemon::new(
        Arc::new(RecordingChannel::new()),
        Arc::new(RecordingArbiter::new()),
        fixed_roots(),
    );
    daemon_a.init().unwrap();

    let daemon_b = Daemon::new(
        Arc::new(RecordingChannel::new()),
        Arc::new(RecordingArbiter::new()),
        fixed_roots(),
    );
    assert!(matches!(
        daemon_b.init(),
        Err(InitError::DiskArbitration(_))
    ));

    daemon_a.uninit();
    // The slot frees up once the active controller disarms.
    daemon_b.init().unwrap();
    daemon_b.uninit();
}

#[test]
#[serial]
fn configure_flows_through_the_facade_and_stats_cover_both_subsystems() {
    let daemon = Daemon::new(
        Arc::new(RecordingChannel::new()),
        Arc::new(RecordingArbiter::new()),
        fixed_roots(),
    );
    daemon.init().unwrap();
    daemon
        .configure(&PolicyMap::from([(ProviderKind::ICloud, BlockLevel::Full)]))
        .unwrap();

    let report = daemon.print_stats();
    assert!(report.contains("event counters"));
    assert!(report.contains("disk counters"));

    daemon.uninit();
}
