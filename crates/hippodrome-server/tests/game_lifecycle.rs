#[allow(dead_code)]
mod common;

use hippodrome_core::net::messages::{
    ClientMessage, EndGameMsg, FoodConsumedMsg, ResetGameMsg, ServerMessage, StartGameMsg,
};
use hippodrome_core::player::{HippoColor, Role};
use hippodrome_core::session::GameMode;

use common::{
    ws_connect, ws_create_session, ws_join, ws_join_with_color, ws_read_until, ws_send,
    ws_try_read, TestServer, WsStream,
};

/// Set up a room with presenter, hippo player (colored), and AAC user.
/// Returns (presenter, hippo, aac, code) with everyone's join traffic drained.
async fn setup_room(server: &TestServer) -> (WsStream, WsStream, WsStream, String) {
    let mut presenter = ws_connect(&server.ws_url()).await;
    let code = ws_create_session(&mut presenter).await;
    ws_join(&mut presenter, &code, "presenter-1", Role::Presenter).await;

    let mut hippo = ws_connect(&server.ws_url()).await;
    ws_join_with_color(
        &mut hippo,
        &code,
        "hippo-1",
        Role::HippoPlayer,
        Some(HippoColor::Teal),
    )
    .await;

    let mut aac = ws_connect(&server.ws_url()).await;
    ws_join(&mut aac, &code, "aac-1", Role::AacUser).await;

    // Drain join broadcasts observed by the earlier clients
    ws_read_until(&mut presenter, 2000, |m| {
        matches!(m, ServerMessage::UsersListUpdate(u) if u.users.len() == 3)
    })
    .await;
    ws_read_until(&mut hippo, 2000, |m| {
        matches!(m, ServerMessage::UsersListUpdate(u) if u.users.len() == 3)
    })
    .await;

    (presenter, hippo, aac, code)
}

fn start_game_msg(code: &str, mode: GameMode) -> ClientMessage {
    ClientMessage::StartGame(StartGameMsg {
        session_id: code.to_string(),
        mode,
    })
}

#[tokio::test]
async fn start_rejected_without_required_roles() {
    let server = TestServer::fast().await;
    let mut presenter = ws_connect(&server.ws_url()).await;
    let code = ws_create_session(&mut presenter).await;
    ws_join(&mut presenter, &code, "presenter-1", Role::Presenter).await;

    ws_send(&mut presenter, &start_game_msg(&code, GameMode::Classic)).await;

    let msg = ws_read_until(&mut presenter, 2000, |m| {
        matches!(m, ServerMessage::ErrorMessage(_))
    })
    .await;
    match msg {
        ServerMessage::ErrorMessage(e) => assert_eq!(e.code, "INVALID_TRANSITION"),
        other => panic!("Expected ErrorMessage, got: {other:?}"),
    }

    // Rejection must not start anything
    let leaked = ws_try_read(&mut presenter, 300).await;
    assert!(
        leaked.is_none(),
        "rejected start must not broadcast: {leaked:?}"
    );
}

#[tokio::test]
async fn full_round_countdown_and_game_over() {
    let server = TestServer::fast().await;
    let (mut presenter, mut hippo, mut aac, code) = setup_room(&server).await;

    ws_send(&mut presenter, &start_game_msg(&code, GameMode::Classic)).await;

    // Everyone gets the round start with the configured duration
    for client in [&mut presenter, &mut hippo, &mut aac] {
        let msg = ws_read_until(client, 2000, |m| {
            matches!(m, ServerMessage::StartGameBroadcast(_))
        })
        .await;
        match msg {
            ServerMessage::StartGameBroadcast(s) => {
                assert_eq!(s.mode, GameMode::Classic);
                assert_eq!(s.duration_seconds, 2);
            },
            other => panic!("Expected StartGameBroadcast, got: {other:?}"),
        }
    }

    // Both playing clients observe the identical countdown then game over
    let mut observed: Vec<Vec<u32>> = Vec::new();
    let mut finals: Vec<ServerMessage> = Vec::new();
    for client in [&mut hippo, &mut aac] {
        let mut ticks = Vec::new();
        let game_over = loop {
            let msg = ws_read_until(client, 5000, |m| {
                matches!(
                    m,
                    ServerMessage::TimerUpdate(_) | ServerMessage::GameOver(_)
                )
            })
            .await;
            match msg {
                ServerMessage::TimerUpdate(t) => ticks.push(t.seconds_left),
                done @ ServerMessage::GameOver(_) => break done,
                other => panic!("Unexpected message: {other:?}"),
            }
        };
        observed.push(ticks);
        finals.push(game_over);
    }

    assert_eq!(observed[0], vec![2, 1, 0]);
    assert_eq!(observed[0], observed[1], "countdown differs between clients");
    assert_eq!(finals[0], finals[1], "final snapshot differs between clients");
    match &finals[0] {
        ServerMessage::GameOver(g) => {
            assert_eq!(g.scores["hippo-1"], 0);
            assert_eq!(g.colors["hippo-1"], HippoColor::Teal);
        },
        other => panic!("Expected GameOver, got: {other:?}"),
    }

    // Exactly one terminal event per round
    let extra = ws_try_read(&mut hippo, 500).await;
    assert!(extra.is_none(), "no frames expected after GAME_OVER: {extra:?}");
}

#[tokio::test]
async fn food_consumed_scores_reach_everyone() {
    let server = TestServer::fast().await;
    let (mut presenter, mut hippo, mut aac, code) = setup_room(&server).await;

    ws_send(&mut presenter, &start_game_msg(&code, GameMode::Classic)).await;
    ws_read_until(&mut hippo, 2000, |m| {
        matches!(m, ServerMessage::StartGameBroadcast(_))
    })
    .await;

    ws_send(
        &mut hippo,
        &ClientMessage::FoodConsumed(FoodConsumedMsg {
            session_id: code.clone(),
            user_id: "hippo-1".to_string(),
            food: "watermelon".to_string(),
            points: 3,
        }),
    )
    .await;

    // The AAC user sees the consumption event and the score snapshot
    let msg = ws_read_until(&mut aac, 2000, |m| {
        matches!(m, ServerMessage::FoodConsumedBroadcast(_))
    })
    .await;
    match msg {
        ServerMessage::FoodConsumedBroadcast(f) => {
            assert_eq!(f.user_id, "hippo-1");
            assert_eq!(f.food, "watermelon");
            assert_eq!(f.points, 3);
        },
        other => panic!("Expected FoodConsumedBroadcast, got: {other:?}"),
    }
    let msg = ws_read_until(&mut aac, 2000, |m| {
        matches!(m, ServerMessage::ScoreUpdateBroadcast(_))
    })
    .await;
    match msg {
        ServerMessage::ScoreUpdateBroadcast(s) => assert_eq!(s.scores["hippo-1"], 3),
        other => panic!("Expected ScoreUpdateBroadcast, got: {other:?}"),
    }

    // The eater gets the snapshot too, and its score survives to game over
    let msg = ws_read_until(&mut hippo, 2000, |m| {
        matches!(m, ServerMessage::ScoreUpdateBroadcast(_))
    })
    .await;
    match msg {
        ServerMessage::ScoreUpdateBroadcast(s) => assert_eq!(s.scores["hippo-1"], 3),
        other => panic!("Expected ScoreUpdateBroadcast, got: {other:?}"),
    }

    let msg = ws_read_until(&mut hippo, 5000, |m| matches!(m, ServerMessage::GameOver(_))).await;
    match msg {
        ServerMessage::GameOver(g) => assert_eq!(g.scores["hippo-1"], 3),
        other => panic!("Expected GameOver, got: {other:?}"),
    }
}

#[tokio::test]
async fn presenter_can_end_game_early() {
    let server = TestServer::fast().await;
    let (mut presenter, mut hippo, _aac, code) = setup_room(&server).await;

    ws_send(&mut presenter, &start_game_msg(&code, GameMode::Classic)).await;
    ws_read_until(&mut presenter, 2000, |m| {
        matches!(m, ServerMessage::StartGameBroadcast(_))
    })
    .await;

    ws_send(
        &mut presenter,
        &ClientMessage::EndGame(EndGameMsg {
            session_id: code.clone(),
        }),
    )
    .await;

    ws_read_until(&mut hippo, 2000, |m| matches!(m, ServerMessage::GameOver(_))).await;

    // The countdown was cancelled with the round
    let extra = ws_try_read(&mut hippo, 1500).await;
    assert!(
        extra.is_none(),
        "no timer frames expected after early end: {extra:?}"
    );
}

#[tokio::test]
async fn hippo_cannot_end_or_reset() {
    let server = TestServer::fast().await;
    let (mut presenter, mut hippo, _aac, code) = setup_room(&server).await;

    ws_send(&mut presenter, &start_game_msg(&code, GameMode::Classic)).await;
    ws_read_until(&mut hippo, 2000, |m| {
        matches!(m, ServerMessage::StartGameBroadcast(_))
    })
    .await;

    ws_send(
        &mut hippo,
        &ClientMessage::EndGame(EndGameMsg {
            session_id: code.clone(),
        }),
    )
    .await;
    let msg = ws_read_until(&mut hippo, 2000, |m| {
        matches!(m, ServerMessage::ErrorMessage(_))
    })
    .await;
    match msg {
        ServerMessage::ErrorMessage(e) => assert_eq!(e.code, "INVALID_TRANSITION"),
        other => panic!("Expected ErrorMessage, got: {other:?}"),
    }
}

#[tokio::test]
async fn reset_returns_to_lobby_and_keeps_players() {
    let server = TestServer::fast().await;
    let (mut presenter, mut hippo, mut aac, code) = setup_room(&server).await;

    ws_send(&mut presenter, &start_game_msg(&code, GameMode::Classic)).await;
    ws_send(
        &mut hippo,
        &ClientMessage::FoodConsumed(FoodConsumedMsg {
            session_id: code.clone(),
            user_id: "hippo-1".to_string(),
            food: "apple".to_string(),
            points: 2,
        }),
    )
    .await;

    // Wait out the 2-second round
    ws_read_until(&mut presenter, 5000, |m| {
        matches!(m, ServerMessage::GameOver(_))
    })
    .await;

    ws_send(
        &mut presenter,
        &ClientMessage::ResetGame(ResetGameMsg {
            session_id: code.clone(),
        }),
    )
    .await;
    for client in [&mut presenter, &mut hippo, &mut aac] {
        ws_read_until(client, 2000, |m| {
            matches!(m, ServerMessage::ResetGameBroadcast(_))
        })
        .await;
    }

    // Roles and colors survived the reset: a new round starts without any
    // re-selection, and the old scores are gone.
    ws_send(&mut presenter, &start_game_msg(&code, GameMode::Classic)).await;
    let msg = ws_read_until(&mut hippo, 2000, |m| {
        matches!(m, ServerMessage::StartGameBroadcast(_))
    })
    .await;
    assert!(matches!(msg, ServerMessage::StartGameBroadcast(_)));

    let msg = ws_read_until(&mut hippo, 5000, |m| matches!(m, ServerMessage::GameOver(_))).await;
    match msg {
        ServerMessage::GameOver(g) => {
            assert_eq!(g.scores["hippo-1"], 0, "reset must clear scores");
            assert_eq!(g.colors["hippo-1"], HippoColor::Teal, "color survives reset");
        },
        other => panic!("Expected GameOver, got: {other:?}"),
    }
}

#[tokio::test]
async fn reset_from_lobby_rejected() {
    let server = TestServer::fast().await;
    let (mut presenter, _hippo, _aac, code) = setup_room(&server).await;

    ws_send(
        &mut presenter,
        &ClientMessage::ResetGame(ResetGameMsg {
            session_id: code.clone(),
        }),
    )
    .await;
    let msg = ws_read_until(&mut presenter, 2000, |m| {
        matches!(m, ServerMessage::ErrorMessage(_))
    })
    .await;
    match msg {
        ServerMessage::ErrorMessage(e) => assert_eq!(e.code, "INVALID_TRANSITION"),
        other => panic!("Expected ErrorMessage, got: {other:?}"),
    }
}

#[tokio::test]
async fn aac_food_selection_reaches_the_room() {
    let server = TestServer::fast().await;
    let (mut presenter, mut hippo, mut aac, code) = setup_room(&server).await;

    ws_send(&mut presenter, &start_game_msg(&code, GameMode::Classic)).await;
    ws_read_until(&mut aac, 2000, |m| {
        matches!(m, ServerMessage::StartGameBroadcast(_))
    })
    .await;

    ws_send(
        &mut aac,
        &ClientMessage::AacFoodSelected(hippodrome_core::net::messages::AacFoodSelectedMsg {
            session_id: code.clone(),
            user_id: "aac-1".to_string(),
            role: Some(Role::AacUser),
            food: "banana".to_string(),
            effect: Some("sparkle".to_string()),
        }),
    )
    .await;

    for client in [&mut presenter, &mut hippo] {
        let msg = ws_read_until(client, 2000, |m| {
            matches!(m, ServerMessage::FoodSelectedBroadcast(_))
        })
        .await;
        match msg {
            ServerMessage::FoodSelectedBroadcast(f) => {
                assert_eq!(f.user_id, "aac-1");
                assert_eq!(f.food, "banana");
                assert_eq!(f.effect.as_deref(), Some("sparkle"));
            },
            other => panic!("Expected FoodSelectedBroadcast, got: {other:?}"),
        }
    }
}
