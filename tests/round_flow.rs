mod support;

use std::time::Duration;

use tokio::io::AsyncWriteExt;
use tokio::net::TcpStream;

#[tokio::test]
async fn telnet_player_plays_a_round_against_bots() {
    let server = support::spawn_server().await;
    let mut client = TcpStream::connect(server.addr).await.expect("connect");

    support::read_until(&mut client, "Enter your name: ", Duration::from_secs(2)).await;
    client.write_all(b"tester\r\n").await.expect("send name");

    // The lobby ticks once a second; a zero wait promotes the round on the next tick.
    support::read_until(&mut client, "GET READY!", Duration::from_secs(5)).await;
    assert_eq!(server.registry.active_rounds(), 1);
    assert_eq!(server.registry.active_players(), 1);

    let round = server.registry.snapshot().pop().expect("running round");
    assert_eq!(round.players().len(), 5);
    assert_eq!(round.humans().count(), 1);
    assert_eq!(round.players()[0].name, "tester");
    assert!(round.players()[1..].iter().all(|p| p.is_bot()));

    // Ctrl-C leaves no human alive, which ends the round.
    client.write_all(&[3]).await.expect("send quit");
    support::read_until(
        &mut client,
        "Round is over, thanks for playing!",
        Duration::from_secs(5),
    )
    .await;

    tokio::time::sleep(Duration::from_millis(200)).await;
    assert_eq!(server.registry.active_rounds(), 0);
    assert!(round.state().is_finished());
}

#[tokio::test]
async fn overlong_name_is_turned_away() {
    let server = support::spawn_server().await;
    let mut client = TcpStream::connect(server.addr).await.expect("connect");

    support::read_until(&mut client, "Enter your name: ", Duration::from_secs(2)).await;
    client
        .write_all(format!("{}\r\n", "n".repeat(26)).as_bytes())
        .await
        .expect("send name");
    support::read_until(&mut client, "at most 25 characters", Duration::from_secs(2)).await;

    assert_eq!(server.lobby.stats().await.waiting_players, 0);
}
