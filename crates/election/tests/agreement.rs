use std::collections::BTreeSet;
use std::time::Duration;

use pretty_assertions::assert_eq;

use primus_election::{
    am_i_the_master, resolve_master, ChainShuffler, Ed25519Signer, PulseScheduler, SharedSecret,
};
use primus_liveness::LivenessView;
use primus_test::{make_chain, make_identity, ScriptedProbe};

const NAMES: [&str; 5] = ["amsterdam", "moscow", "almaty", "spb", "novosibirsk"];
const NOW: Duration = Duration::from_secs(1_700_000_000);

const KEY: &str = "9d61b19deffd5a60ba844af492ec2cc44449c5697b326919703bac031cae7f60";

fn view(alive: &[&str]) -> LivenessView {
    LivenessView::from_outcomes(NAMES.iter().map(|name| (*name, alive.contains(name))))
}

#[test]
fn healthy_nodes_agree_on_the_pulse_order() {
    let chain = make_chain(&NAMES);
    let view = view(&["moscow", "spb"]);
    let scheduler = PulseScheduler::new(Duration::from_secs(30), Duration::from_secs(60));

    let moscow = scheduler.schedule(&chain, &view, "moscow", NOW);
    let spb = scheduler.schedule(&chain, &view, "spb", NOW + Duration::from_secs(59));

    assert_eq!(moscow.order, spb.order);
    assert_eq!(moscow.total_slots(), 2);

    let slots: BTreeSet<_> = [moscow.my_slot.unwrap(), spb.my_slot.unwrap()].into();
    assert_eq!(slots, BTreeSet::from([0, 1]));

    // Exactly one of them is active at any point of a slot
    for secs in [0, 10, 29, 30, 45, 59] {
        let at = NOW - Duration::from_nanos(NOW.as_nanos() as u64 % 120_000_000_000)
            + Duration::from_secs(secs);
        assert!(moscow.is_active_at(at) ^ spb.is_active_at(at), "at +{secs}s");
    }
}

#[test]
fn shared_secret_changes_the_order_consistently() {
    let chain = make_chain(&NAMES);
    let view = view(&NAMES);

    let scheduler = |secret: &str| {
        PulseScheduler::new(Duration::from_secs(30), Duration::from_secs(60))
            .with_signer(SharedSecret::new(secret))
    };

    let orders: BTreeSet<Vec<String>> = (0..8)
        .map(|i| scheduler(&format!("secret-{i}")).schedule(&chain, &view, "spb", NOW).order)
        .collect();
    assert!(orders.len() > 1);

    let a = scheduler("secret").schedule(&chain, &view, "amsterdam", NOW);
    let b = scheduler("secret").schedule(&chain, &view, "almaty", NOW);
    assert_eq!(a.order, b.order);
}

#[test]
fn signed_shuffles_agree_with_the_same_key() {
    let chain = make_chain(&NAMES);
    let view = view(&["amsterdam", "moscow", "almaty", "spb"]);

    let a = ChainShuffler::new(Ed25519Signer::from_hex(KEY).unwrap());
    let b = ChainShuffler::new(Ed25519Signer::from_hex(KEY).unwrap());

    let shuffled = a.shuffle_with_nonce(&chain, &view, NOW, 42).unwrap();
    assert_eq!(Some(shuffled.clone()), b.shuffle_with_nonce(&chain, &view, NOW, 42));

    assert_eq!(shuffled.len(), 4);
    assert!(!shuffled.contains("novosibirsk"));
    assert!(shuffled.is_subset_of(&chain));
}

#[tokio::test]
async fn lazy_resolution_matches_the_view() {
    let chain = make_chain(&NAMES);
    let probe = ScriptedProbe::new();

    for mask in 0u32..32 {
        let alive: Vec<&str> = NAMES
            .iter()
            .enumerate()
            .filter(|(i, _)| mask & (1 << i) != 0)
            .map(|(_, name)| *name)
            .collect();

        probe.only(&chain, &alive);
        let view = view(&alive);

        for name in NAMES {
            let me = make_identity(&chain, name);
            assert_eq!(
                am_i_the_master(&chain, &me, &probe).await,
                resolve_master(&chain, &me, &view),
                "{name} with {alive:?}"
            );
        }
    }
}

#[tokio::test]
async fn lazy_resolution_stops_at_the_first_live_node() {
    let chain = make_chain(&NAMES);
    let probe = ScriptedProbe::all_alive(&chain);
    probe.set_node(&chain, "amsterdam", false);

    let me = make_identity(&chain, "spb");
    assert!(!am_i_the_master(&chain, &me, &probe).await);
    assert_eq!(probe.probe_count(), 2);

    let stranger = make_identity(&chain, "berlin");
    assert!(!am_i_the_master(&chain, &stranger, &probe).await);
    assert_eq!(probe.probe_count(), 2);
}
