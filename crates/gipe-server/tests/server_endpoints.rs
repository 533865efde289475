use std::sync::Arc;

use gipe_auth::password::hash_password;
use gipe_auth::{InMemoryIdentityStore, Network, Principal, Role};
use gipe_server::{AppConfig, ServerBuilder};
use serde_json::{Value, json};
use tokio::task::JoinHandle;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

struct TestServer {
    base: String,
    store: Arc<InMemoryIdentityStore>,
    shutdown: tokio::sync::oneshot::Sender<()>,
    handle: JoinHandle<()>,
}

impl TestServer {
    async fn stop(self) {
        let _ = self.shutdown.send(());
        let _ = self.handle.await;
    }
}

fn test_config(integration_base: &str) -> AppConfig {
    let mut cfg = AppConfig::default();
    cfg.auth.integration.base_url = integration_base.to_string();
    cfg.auth.integration.api_key = "test-key".into();
    cfg.auth.integration.system_code = "42".into();
    cfg.auth.token.secret = "test-token-secret".into();
    cfg.auth.password_reset.secret = "test-reset-secret".into();
    cfg
}

async fn start_server(integration: &MockServer) -> TestServer {
    let store = Arc::new(InMemoryIdentityStore::new());
    let server = ServerBuilder::new()
        .with_config(test_config(&integration.uri()))
        .with_identity_store(store.clone())
        .build()
        .await
        .expect("build server");
    let app = server.into_router();

    // Bind to an ephemeral port
    let listener = tokio::net::TcpListener::bind((std::net::Ipv4Addr::LOCALHOST, 0))
        .await
        .expect("bind");
    let addr = listener.local_addr().unwrap();
    let (tx, rx) = tokio::sync::oneshot::channel::<()>();

    let handle = tokio::spawn(async move {
        let _ = axum::serve(listener, app)
            .with_graceful_shutdown(async move {
                let _ = rx.await;
            })
            .await;
    });

    TestServer {
        base: format!("http://{addr}"),
        store,
        shutdown: tx,
        handle,
    }
}

async fn mount_director(integration: &MockServer) {
    Mock::given(method("POST"))
        .and(path("/v1/autenticacao/externa"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "nome": "Maria da Silva",
            "email": "maria@sme.prefeitura.sp.gov.br",
            "numeroDocumento": "12345678901",
            "login": "1234567",
            "perfis": []
        })))
        .mount(integration)
        .await;

    Mock::given(method("GET"))
        .and(path("/Intranet/CarregarPerfisPorLogin/1234567"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "cargos": [{"codigo": 3360, "descricao": "DIRETOR DE ESCOLA"}]
        })))
        .mount(integration)
        .await;
}

#[tokio::test]
async fn healthz_reports_ok() {
    let integration = MockServer::start().await;
    let server = start_server(&integration).await;

    let resp = reqwest::get(format!("{}/healthz", server.base)).await.unwrap();
    assert!(resp.status().is_success());
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["status"], "ok");

    server.stop().await;
}

#[tokio::test]
async fn rf_login_then_verify_refresh_and_change_password() {
    let integration = MockServer::start().await;
    mount_director(&integration).await;
    Mock::given(method("POST"))
        .and(path("/AutenticacaoSgp/AlterarSenha"))
        .respond_with(ResponseTemplate::new(200))
        .expect(1)
        .mount(&integration)
        .await;

    let server = start_server(&integration).await;
    let client = reqwest::Client::new();

    // Punctuation in the login is stripped.
    let resp = client
        .post(format!("{}/login", server.base))
        .json(&json!({"login": "123.456-7", "senha": "Senha@123"}))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 200);
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["login"], "1234567");
    assert_eq!(body["name"], "Maria da Silva");
    assert_eq!(body["cpf"], "12345678901");
    assert_eq!(body["perfil_acesso"]["codigo"], 3360);
    assert_eq!(body["perfil_acesso"]["nome"], "DIRETOR DE ESCOLA");
    assert_eq!(body["unidade_lotacao"], json!([]));
    let access = body["token"].as_str().expect("access token").to_string();
    let refresh = body["refresh"].as_str().expect("refresh token").to_string();
    assert_eq!(server.store.principal_count().await, 1);

    // Token from the Authorization header
    let resp = client
        .post(format!("{}/verify-token", server.base))
        .bearer_auth(&access)
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 200);
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["detail"], "Token válido.");

    let resp = client
        .post(format!("{}/verify-token", server.base))
        .json(&json!({"token": "not-a-jwt"}))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 401);

    let resp = client
        .post(format!("{}/verify-token", server.base))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 400);

    let resp = client
        .post(format!("{}/token/refresh", server.base))
        .json(&json!({"refresh": refresh}))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 200);
    let body: Value = resp.json().await.unwrap();
    assert!(body["access"].as_str().is_some_and(|t| !t.is_empty()));

    // An access token is not a refresh token.
    let resp = client
        .post(format!("{}/token/refresh", server.base))
        .json(&json!({"refresh": access}))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 401);

    let resp = client
        .post(format!("{}/atualizar-senha", server.base))
        .json(&json!({
            "senha_atual": "Senha@123",
            "nova_senha": "Nova@4567",
            "confirmacao_nova_senha": "Nova@4567"
        }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 401);

    let resp = client
        .post(format!("{}/atualizar-senha", server.base))
        .bearer_auth(&access)
        .json(&json!({
            "senha_atual": "Senha@123",
            "nova_senha": "Nova@4567",
            "confirmacao_nova_senha": "Nova@4567"
        }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 200);
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["detail"], "Senha atualizada com sucesso.");

    server.stop().await;
}

#[tokio::test]
async fn login_failures_map_to_status_codes() {
    let integration = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v1/autenticacao/externa"))
        .respond_with(ResponseTemplate::new(401))
        .mount(&integration)
        .await;

    let server = start_server(&integration).await;
    let client = reqwest::Client::new();

    let resp = client
        .post(format!("{}/login", server.base))
        .json(&json!({"username": "1234567", "password": "errada"}))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 401);
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["detail"], "Usuário e/ou senha inválida");

    let resp = client
        .post(format!("{}/login", server.base))
        .json(&json!({"username": "12345", "password": "x"}))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 400);

    let resp = client
        .post(format!("{}/login", server.base))
        .header("content-type", "application/json")
        .body("{not json")
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 400);
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["detail"], "Credenciais inválidas");

    assert_eq!(server.store.write_count(), 0);
    server.stop().await;
}

#[tokio::test]
async fn cpf_login_is_local_only() {
    let integration = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v1/autenticacao/externa"))
        .respond_with(ResponseTemplate::new(500))
        .expect(0)
        .mount(&integration)
        .await;

    let server = start_server(&integration).await;
    server
        .store
        .insert(
            Principal::builder("98765432100")
                .name("João Parceiro")
                .cpf("98765432100")
                .password_hash(hash_password("Parceiro@1").unwrap())
                .role(Role::new(3360, "DIRETOR DE ESCOLA"))
                .network(Network::Indireta)
                .validated(true)
                .build(),
        )
        .await;

    let resp = reqwest::Client::new()
        .post(format!("{}/login", server.base))
        .json(&json!({"username": "987.654.321-00", "password": "Parceiro@1"}))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 200);
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["login"], "98765432100");
    assert_eq!(body["perfil_acesso"]["codigo"], 3360);

    server.stop().await;
}

#[tokio::test]
async fn forgot_password_for_unknown_user_is_bad_request() {
    let integration = MockServer::start().await;
    let server = start_server(&integration).await;

    let resp = reqwest::Client::new()
        .post(format!("{}/esqueci-senha", server.base))
        .json(&json!({"username": "7654321"}))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 400);
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["detail"], "Usuário 7654321 não encontrado.");

    server.stop().await;
}
