// auth-server/tests/auth_client_test.rs
use actix_web::{web, App, HttpServer};
use auth_server::password::PasswordHasher;
use auth_server::{api, AppState, CredentialStore};
use common::{AuthClient, AuthClientError, PasswordHashConfig, Session};
use std::sync::Arc;

const REGISTRAR_KEY: &str = "secret";

fn state() -> AppState {
    let hasher = PasswordHasher::new(&PasswordHashConfig {
        memory_kib: 8,
        iterations: 1,
        parallelism: 1,
    })
    .unwrap();
    AppState::new(Arc::new(CredentialStore::new(REGISTRAR_KEY, hasher).unwrap()))
}

#[actix_web::test]
async fn test_client_against_running_server() -> Result<(), Box<dyn std::error::Error>> {
    let state = web::Data::new(state());

    let server = HttpServer::new({
        let state = state.clone();
        move || App::new().app_data(state.clone()).configure(api::configure)
    })
    .workers(1)
    .bind(("127.0.0.1", 0))?;

    let addr = server.addrs()[0];
    let server = server.run();
    let handle = server.handle();
    actix_web::rt::spawn(server);

    let client = AuthClient::new(format!("http://{}", addr));

    // Minting codes needs the registrar key
    assert!(matches!(
        client.create_invite_code("guess").await,
        Err(AuthClientError::Unauthorized)
    ));
    let code = client.create_invite_code(REGISTRAR_KEY).await?;

    let user_id = client.register(&code, "hunter2").await?;
    assert!(matches!(
        client.register(&code, "hunter2").await,
        Err(AuthClientError::BadRequest(_))
    ));

    assert!(matches!(
        client.login(&user_id, "wrong").await,
        Err(AuthClientError::Unauthorized)
    ));
    let session = client.login(&user_id, "hunter2").await?;
    assert_eq!(session.user_id, user_id);

    client.validate_session(&session).await?;
    assert!(matches!(
        client.validate_session(&Session::new(user_id.clone(), "forged")).await,
        Err(AuthClientError::Unauthorized)
    ));

    let profile = client.user(&session).await?;
    assert_eq!(profile.user_id, user_id);
    assert_eq!(profile.active_sessions, 1);

    client.logout(&session).await?;
    assert!(matches!(
        client.validate_session(&session).await,
        Err(AuthClientError::Unauthorized)
    ));
    assert_eq!(state.store.get(&user_id).unwrap().active_sessions, 0);

    handle.stop(true).await;
    Ok(())
}
