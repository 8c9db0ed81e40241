//! Host and peers talking over the loopback transport.

mod common;

use common::{owner_of, Net, HOST};
use tether_networking::entity::{CoinPayload, EnemyPayload, TRIPLE_HEADER_SIZE};
use tether_networking::protocol::PunchKind;
use tether_networking::{
    AdmissionError, Administration, ClientState, Endpoint, EntityPayload, NetEvent, NetworkConditions, NetworkConfig, Packet,
    PermissiveAdministration, Server, Transport, Writer,
};
use tether_shared::{DamageKind, EntityCategory, EntityId, EntityType, KickReason, PacketType, PeerId, Reliability, Vec3};

const B: PeerId = PeerId(2);
const C: PeerId = PeerId(3);

#[test]
fn test_handshake_and_player_exchange() {
    let mut net = Net::new(NetworkConditions::PERFECT);
    let b = net.join(B);
    net.run(3);

    let peer = &net.peers[b];
    assert_eq!(peer.client.state(), ClientState::Connected);
    assert!(peer.session.registry().contains(HOST.entity()));
    assert!(net.host.session.registry().contains(B.entity()));
    assert_eq!(net.host.session.registry().count(EntityCategory::Player), 2);
    assert!(peer.client.snapshots_applied() >= 2);
}

#[test]
fn test_host_spawn_reaches_peer() {
    let mut net = Net::new(NetworkConditions::PERFECT);
    let b = net.join(B);
    let coin = net
        .host
        .session
        .spawn(EntityType::Coin, Vec3::new(4.0, 5.0, 6.0), &mut net.host.sim)
        .unwrap();
    net.run(2);

    let peer = &net.peers[b];
    assert_eq!(owner_of(&peer.session, coin), Some(HOST));
    assert_eq!(peer.sim.objects_of(EntityType::Coin).count(), 1);
    let (_, object) = peer.sim.objects_of(EntityType::Coin).next().unwrap();
    assert!(object.kinematic);
}

#[test]
fn test_peer_spawn_is_relayed_to_other_peers() {
    let mut net = Net::new(NetworkConditions::PERFECT);
    let b = net.join(B);
    let c = net.join(C);
    net.run(2);

    let skull = {
        let peer = &mut net.peers[b];
        peer.session
            .spawn(EntityType::BlueSkull, Vec3::Y, &mut peer.sim)
            .unwrap()
    };
    assert_eq!(skull, EntityId(2_000_000));
    net.run(3);

    assert_eq!(owner_of(&net.host.session, skull), Some(B));
    assert_eq!(owner_of(&net.peers[c].session, skull), Some(B));
    assert_eq!(net.peers[c].sim.objects_of(EntityType::BlueSkull).count(), 1);
    assert_eq!(net.host.server.stats().entities_admitted, 3);
}

#[test]
fn test_ownership_transfer_under_contention() {
    let mut net = Net::new(NetworkConditions::PERFECT);
    let b = net.join(B);
    let coin = net
        .host
        .session
        .spawn(EntityType::Coin, Vec3::ZERO, &mut net.host.sim)
        .unwrap();
    net.run(3);
    assert_eq!(owner_of(&net.peers[b].session, coin), Some(HOST));

    {
        let peer = &mut net.peers[b];
        assert!(peer.session.take_ownage(coin, &mut peer.sim));
    }

    // The host has not heard of the claim yet and still broadcasts itself.
    net.host.tick();
    assert_eq!(owner_of(&net.host.session, coin), Some(HOST));

    // That stale claim lands inside the peer's lock window.
    net.peers[b].tick();
    assert_eq!(owner_of(&net.peers[b].session, coin), Some(B));
    let (_, object) = net.peers[b].sim.objects_of(EntityType::Coin).next().unwrap();
    assert!(!object.kinematic);

    net.host.tick();
    assert_eq!(owner_of(&net.host.session, coin), Some(B));
    let (_, object) = net.host.sim.objects_of(EntityType::Coin).next().unwrap();
    assert!(object.kinematic);

    net.run(5);
    assert_eq!(owner_of(&net.host.session, coin), Some(B));
    assert_eq!(owner_of(&net.peers[b].session, coin), Some(B));
}

fn forged_snapshot(triples: &[(EntityId, EntityType, EntityPayload)]) -> Vec<u8> {
    let size = triples
        .iter()
        .map(|(_, ty, _)| TRIPLE_HEADER_SIZE + EntityPayload::max_size(*ty))
        .sum();
    let mut buf = vec![0u8; size];
    let mut w = Writer::new(&mut buf);
    for (id, ty, payload) in triples {
        w.write_entity(*id).unwrap();
        w.write_u8(ty.to_u8()).unwrap();
        payload.write(&mut w).unwrap();
    }
    let len = w.len();
    buf.truncate(len);
    buf
}

#[test]
fn test_boss_from_peer_is_rejected_whole() {
    let mut net = Net::new(NetworkConditions::PERFECT);
    let b = net.join(B);
    let c = net.join(C);
    net.run(2);

    let boss = EntityPayload::Enemy(EnemyPayload {
        owner: B,
        health: 120.0,
        position: Vec3::ZERO,
        yaw: 0.0,
        flags: 0,
    });
    let coin = EntityPayload::Coin(CoinPayload {
        owner: B,
        position: Vec3::Y,
        velocity: Vec3::ZERO,
        team: 1,
        flags: 0,
        power: None,
    });
    let bytes = forged_snapshot(&[
        (EntityId(5000), EntityType::Colossus, boss),
        (EntityId(5001), EntityType::Coin, coin),
    ]);
    net.peers[b]
        .transport
        .send(HOST, PacketType::Snapshot, &bytes, Reliability::Unreliable)
        .unwrap();
    net.run(3);

    for id in [EntityId(5000), EntityId(5001)] {
        assert!(!net.host.session.registry().contains(id));
        assert!(!net.peers[c].session.registry().contains(id));
    }
    assert_eq!(net.peers[c].sim.objects_of(EntityType::Colossus).count(), 0);
    assert_eq!(net.host.server.stats().violations, 1);
    assert_eq!(net.peers[b].client.state(), ClientState::Connected);
}

#[test]
fn test_peer_may_spawn_ordinary_enemies() {
    let mut net = Net::new(NetworkConditions::PERFECT);
    let b = net.join(B);
    net.run(2);

    let husk = {
        let peer = &mut net.peers[b];
        peer.session.spawn(EntityType::Husk, Vec3::ZERO, &mut peer.sim).unwrap()
    };
    net.run(2);
    assert_eq!(owner_of(&net.host.session, husk), Some(B));
    assert_eq!(net.host.server.stats().violations, 0);
}

#[test]
fn test_peer_enemies_can_be_disabled() {
    let config = NetworkConfig {
        allow_client_enemies: false,
        ..NetworkConfig::default()
    };
    let mut net = Net::with_server(NetworkConditions::PERFECT, config, Server::permissive());
    let b = net.join(B);
    net.run(2);

    let husk = {
        let peer = &mut net.peers[b];
        peer.session.spawn(EntityType::Husk, Vec3::ZERO, &mut peer.sim).unwrap()
    };
    net.run(2);
    assert!(!net.host.session.registry().contains(husk));
    assert!(net.host.server.stats().violations >= 1);
}

#[test]
fn test_impersonated_redirect_is_dropped() {
    let mut net = Net::new(NetworkConditions::PERFECT);
    let b = net.join(B);
    let c = net.join(C);
    net.run(2);
    net.peers[c].client.drain_events();

    let forged = Packet::Punch {
        sender: C,
        kind: PunchKind::Jab,
        position: Vec3::ZERO,
    };
    {
        let peer = &mut net.peers[b];
        peer.client
            .send(&peer.session, &mut peer.transport, &mut peer.arena, &forged)
            .unwrap();
    }
    net.run(2);
    assert!(net.peers[c].client.drain_events().is_empty());
    assert!(net.host.server.drain_events().is_empty());
    assert_eq!(net.host.server.stats().violations, 1);

    let honest = Packet::Punch {
        sender: B,
        kind: PunchKind::Parry,
        position: Vec3::Y,
    };
    {
        let peer = &mut net.peers[b];
        peer.client
            .send(&peer.session, &mut peer.transport, &mut peer.arena, &honest)
            .unwrap();
    }
    net.run(2);
    let expected = NetEvent::Punch {
        sender: B,
        kind: PunchKind::Parry,
        position: Vec3::Y,
    };
    assert_eq!(net.peers[c].client.drain_events(), vec![expected.clone()]);
    assert_eq!(net.host.server.drain_events(), vec![expected]);
    assert!(net.peers[b].client.drain_events().is_empty());
}

#[test]
fn test_damage_and_kill_propagate() {
    let mut net = Net::new(NetworkConditions::PERFECT);
    let b = net.join(B);
    let husk = net
        .host
        .session
        .spawn(EntityType::Husk, Vec3::ZERO, &mut net.host.sim)
        .unwrap();
    net.run(3);
    assert!(net.peers[b].session.registry().contains(husk));

    for target in [husk, HOST.entity()] {
        let hit = Packet::DamageEntity {
            sender: B,
            target,
            amount: 50.0,
            kind: DamageKind::Explosion,
            direction: Vec3::Y,
        };
        let peer = &mut net.peers[b];
        peer.client
            .send(&peer.session, &mut peer.transport, &mut peer.arena, &hit)
            .unwrap();
    }
    net.run(3);

    assert!(net.host.session.registry().is_tombstoned(husk));
    assert!(net.peers[b].session.registry().is_tombstoned(husk));
    assert!((net.host.sim.local_damage() - 50.0).abs() < f32::EPSILON);
}

#[test]
fn test_kill_requires_authority() {
    let mut net = Net::new(NetworkConditions::PERFECT);
    let b = net.join(B);
    let husk = net
        .host
        .session
        .spawn(EntityType::Husk, Vec3::ZERO, &mut net.host.sim)
        .unwrap();
    net.run(3);

    let kill = Packet::KillEntity {
        sender: B,
        target: husk,
    };
    {
        let peer = &mut net.peers[b];
        peer.client
            .send(&peer.session, &mut peer.transport, &mut peer.arena, &kill)
            .unwrap();
    }
    net.run(2);
    assert!(net.host.session.registry().contains(husk));
    assert_eq!(net.host.server.stats().violations, 1);
}

#[test]
fn test_version_mismatch_sends_peer_to_menu() {
    let mut net = Net::new(NetworkConditions::PERFECT);
    let config = NetworkConfig {
        protocol_version: (2, 0, 0),
        ..NetworkConfig::default()
    };
    let b = net.join_with(B, config);
    net.run(2);

    let peer = &net.peers[b];
    assert_eq!(peer.client.state(), ClientState::Disconnected);
    assert_eq!(peer.sim.menu_reason(), Some(KickReason::VersionMismatch.message()));
    assert!(peer.session.registry().is_empty());
    assert!(!net.host.session.lobby().contains(B));
    assert_eq!(net.host.server.stats().kicks, 1);
}

#[test]
fn test_kick_notifies_peer() {
    let mut net = Net::new(NetworkConditions::PERFECT);
    let b = net.join(B);
    net.run(2);

    net.host
        .server
        .kick(
            B,
            KickReason::Kicked,
            &mut net.host.session,
            &mut net.host.sim,
            &mut net.host.transport,
            &mut net.host.arena,
        )
        .unwrap();
    net.run(1);

    let peer = &mut net.peers[b];
    assert_eq!(peer.client.state(), ClientState::Disconnected);
    assert_eq!(peer.sim.menu_reason(), Some(KickReason::Kicked.message()));
    assert!(peer.client.drain_events().contains(&NetEvent::Disconnected {
        reason: KickReason::Kicked
    }));
    assert!(!net.host.session.registry().contains(B.entity()));
}

#[test]
fn test_level_change_clears_everything_but_players() {
    let mut net = Net::new(NetworkConditions::PERFECT);
    let b = net.join(B);
    let coin = net
        .host
        .session
        .spawn(EntityType::Coin, Vec3::ZERO, &mut net.host.sim)
        .unwrap();
    net.run(3);
    assert!(net.peers[b].session.registry().contains(coin));

    net.host
        .server
        .load_level(
            "Level 1-1",
            &mut net.host.session,
            &mut net.host.sim,
            &mut net.host.transport,
            &mut net.host.arena,
        )
        .unwrap();
    net.run(2);

    let peer = &net.peers[b];
    assert_eq!(peer.sim.level(), Some("Level 1-1"));
    assert_eq!(peer.session.level(), Some("Level 1-1"));
    assert!(!peer.session.registry().contains(coin));
    assert!(peer.session.registry().contains(HOST.entity()));
    assert!(!net.host.session.registry().contains(coin));
    assert!(net.host.session.registry().contains(B.entity()));
}

#[test]
fn test_late_joiner_gets_current_level() {
    let mut net = Net::new(NetworkConditions::PERFECT);
    net.host
        .server
        .load_level(
            "Level 0-2",
            &mut net.host.session,
            &mut net.host.sim,
            &mut net.host.transport,
            &mut net.host.arena,
        )
        .unwrap();
    let b = net.join(B);
    net.run(2);
    assert_eq!(net.peers[b].sim.level(), Some("Level 0-2"));
}

#[test]
fn test_departed_peer_entities_are_adopted() {
    let mut net = Net::new(NetworkConditions::PERFECT);
    let b = net.join(B);
    let c = net.join(C);
    net.run(2);
    let torch = {
        let peer = &mut net.peers[b];
        peer.session.spawn(EntityType::Torch, Vec3::ZERO, &mut peer.sim).unwrap()
    };
    net.run(3);
    assert_eq!(owner_of(&net.host.session, torch), Some(B));

    net.host
        .server
        .remove_peer(
            B,
            &mut net.host.session,
            &mut net.host.sim,
            &mut net.host.transport,
            &mut net.host.arena,
        )
        .unwrap();
    assert_eq!(owner_of(&net.host.session, torch), Some(HOST));
    assert!(!net.host.session.registry().contains(B.entity()));

    net.run(2);
    assert!(!net.peers[c].session.registry().contains(B.entity()));
    assert_eq!(owner_of(&net.peers[c].session, torch), Some(HOST));
}

#[test]
fn test_duplicated_snapshots_create_once() {
    let conditions = NetworkConditions {
        packet_loss_percent: 0.0,
        duplicate_percent: 100.0,
    };
    let mut net = Net::new(conditions);
    let b = net.join(B);
    net.host
        .session
        .spawn(EntityType::Coin, Vec3::ZERO, &mut net.host.sim)
        .unwrap();
    net.run(4);

    let peer = &net.peers[b];
    assert_eq!(peer.session.registry().count(EntityCategory::Coin), 1);
    assert_eq!(peer.sim.objects_of(EntityType::Coin).count(), 1);
    assert!(net.hub.stats().packets_duplicated > 0);
}

#[test]
fn test_lossy_link_converges() {
    let mut net = Net::new(NetworkConditions::lossy(30.0));
    let b = net.join(B);
    let torch = net
        .host
        .session
        .spawn(EntityType::Torch, Vec3::ZERO, &mut net.host.sim)
        .unwrap();
    net.run(60);

    assert_eq!(owner_of(&net.peers[b].session, torch), Some(HOST));
    assert!(net.host.session.registry().contains(B.entity()));
    assert!(net.hub.stats().packets_dropped > 0);
}

#[test]
fn test_admission_errors() {
    let mut admin = PermissiveAdministration::new();
    admin.ban(PeerId(99));
    let mut net = Net::with_server(
        NetworkConditions::PERFECT,
        NetworkConfig::default(),
        Server::new(Box::new(admin)),
    );

    assert_eq!(
        net.host.server.admit(PeerId(99), &mut net.host.session),
        Err(AdmissionError::Banned(PeerId(99)))
    );
    net.join(B);
    assert_eq!(
        net.host.server.admit(B, &mut net.host.session),
        Err(AdmissionError::AlreadyConnected(B))
    );
    for peer in 3..=8 {
        net.host.server.admit(PeerId(peer), &mut net.host.session).unwrap();
    }
    assert!(matches!(
        net.host.server.admit(PeerId(50), &mut net.host.session),
        Err(AdmissionError::SessionFull(_))
    ));
}

#[test]
fn test_players_join_beside_existing_objects() {
    let mut net = Net::new(NetworkConditions::PERFECT);
    let coin = net
        .host
        .session
        .spawn(EntityType::Coin, Vec3::Y, &mut net.host.sim)
        .unwrap();
    assert!(coin.0 >= net.config.client_id_block);

    let b = net.join(B);
    net.run(3);

    for session in [&net.host.session, &net.peers[b].session] {
        assert_eq!(session.registry().count(EntityCategory::Player), 2);
        assert_eq!(session.registry().count(EntityCategory::Coin), 1);
        assert_eq!(owner_of(session, coin), Some(HOST));
    }
}

#[test]
fn test_peer_id_naming_an_object_is_refused() {
    let mut net = Net::new(NetworkConditions::PERFECT);
    let coin = net
        .host
        .session
        .spawn(EntityType::Coin, Vec3::Y, &mut net.host.sim)
        .unwrap();

    let squatter = coin.peer();
    assert_eq!(
        net.host.server.admit(squatter, &mut net.host.session),
        Err(AdmissionError::IdInUse(squatter))
    );
    assert!(!net.host.session.lobby().contains(squatter));
    assert_eq!(owner_of(&net.host.session, coin), Some(HOST));
}

#[test]
fn test_peers_learn_late_joiners_and_leavers() {
    let mut net = Net::new(NetworkConditions::PERFECT);
    let b = net.join(B);
    net.run(2);

    // Joins at the first id of B's block.
    let late = PeerId(2 * net.config.client_id_block);
    let l = net.join(late);
    net.run(3);
    assert!(net.peers[b].session.lobby().contains(late));
    assert!(net.peers[l].session.lobby().contains(B));

    let coin = {
        let peer = &mut net.peers[b];
        peer.session.spawn(EntityType::Coin, Vec3::ZERO, &mut peer.sim).unwrap()
    };
    assert_ne!(coin, late.entity());
    net.run(3);

    for session in [&net.host.session, &net.peers[b].session, &net.peers[l].session] {
        assert_eq!(session.registry().count(EntityCategory::Player), 3);
        assert_eq!(owner_of(session, coin), Some(B));
        let player = session.registry().find(late.entity()).map(|e| e.ty());
        assert_eq!(player, Some(EntityType::Player));
    }

    net.remove(late);
    net.run(2);
    assert!(!net.peers[b].session.lobby().contains(late));
    assert!(net.peers[b].session.lobby().contains(B));
    assert_eq!(net.peers[b].session.registry().count(EntityCategory::Player), 2);
}
