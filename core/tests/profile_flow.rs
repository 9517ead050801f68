/// End-to-end profile flows against a mocked JSON-RPC node and profile API.
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use dao_profile_core::network::selector;
use dao_profile_core::{
    recover_personal_signature, Address, AuthError, BalanceError, Command, Deployments,
    HttpProfileStore, KeyValueCache, LocalWalletProvider, NetworkClient, OrganizationContext,
    ProfileError, ProfileForm, ProfileService, ProviderError, RpcContractResolver, Signature,
    Signer, SoftwareSigner, SqliteCache, WalletProvider, CHALLENGE_MESSAGE,
};
use serde_json::json;
use tokio_util::sync::CancellationToken;
use wiremock::matchers::{body_partial_json, body_string_contains, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

const GENESIS_PROTOCOL: &str = "0x0000000000000000000000000000000000000010";
const STAKING_TOKEN: &str = "0x0000000000000000000000000000000000000011";
const CONTRIBUTION_REWARD: &str = "0x0000000000000000000000000000000000000030";

/// Counts sign requests that reach the underlying wallet.
struct CountingWallet {
    inner: LocalWalletProvider,
    signs: AtomicUsize,
}

#[async_trait]
impl WalletProvider for CountingWallet {
    async fn balance(&self, address: &Address) -> Result<u128, ProviderError> {
        self.inner.balance(address).await
    }

    async fn personal_sign(
        &self,
        message: &[u8],
        address: &Address,
        cancel: &CancellationToken,
    ) -> Result<Signature, ProviderError> {
        self.signs.fetch_add(1, Ordering::SeqCst);
        self.inner.personal_sign(message, address, cancel).await
    }
}

/// Wallet whose sign prompt is never answered.
struct UnansweredWallet;

#[async_trait]
impl WalletProvider for UnansweredWallet {
    async fn balance(&self, _: &Address) -> Result<u128, ProviderError> {
        Ok(0)
    }

    async fn personal_sign(
        &self,
        _: &[u8],
        _: &Address,
        _: &CancellationToken,
    ) -> Result<Signature, ProviderError> {
        std::future::pending().await
    }
}

struct Harness {
    rpc: MockServer,
    api: MockServer,
    network: Arc<NetworkClient>,
    cache: Arc<SqliteCache>,
    _dir: tempfile::TempDir,
}

impl Harness {
    async fn start() -> Self {
        let rpc = MockServer::start().await;
        let api = MockServer::start().await;
        let network = Arc::new(NetworkClient::new_custom(&rpc.uri(), true).unwrap());
        let dir = tempfile::tempdir().unwrap();
        let cache = Arc::new(SqliteCache::open_at(&dir.path().join("cache.db")).unwrap());
        Self {
            rpc,
            api,
            network,
            cache,
            _dir: dir,
        }
    }

    fn wallet(&self, signer: Arc<SoftwareSigner>) -> Arc<CountingWallet> {
        Arc::new(CountingWallet {
            inner: LocalWalletProvider::new(self.network.clone(), signer),
            signs: AtomicUsize::new(0),
        })
    }

    fn service(&self, address: Address, wallet: Arc<dyn WalletProvider>) -> ProfileService {
        let resolver = RpcContractResolver::new(
            self.network.clone(),
            Deployments {
                genesis_protocol: Some(GENESIS_PROTOCOL.parse().unwrap()),
                contribution_reward: Some(CONTRIBUTION_REWARD.parse().unwrap()),
            },
        );
        ProfileService::new(
            address,
            wallet,
            Arc::new(resolver),
            Arc::new(HttpProfileStore::new(&self.api.uri())),
            self.cache.clone(),
        )
    }

    async fn accept_profile_writes(&self) {
        Mock::given(method("POST"))
            .and(path("/api/accounts"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "ok": true })))
            .mount(&self.api)
            .await;
    }

    async fn profile_writes(&self) -> Vec<serde_json::Value> {
        self.api
            .received_requests()
            .await
            .unwrap_or_default()
            .iter()
            .filter(|r| r.method.as_str() == "POST")
            .map(|r| serde_json::from_slice(&r.body).unwrap())
            .collect()
    }

    async fn mock_rpc(&self, needle: String, result: String) {
        Mock::given(method("POST"))
            .and(body_string_contains(needle))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "jsonrpc": "2.0", "id": 1, "result": result
            })))
            .mount(&self.rpc)
            .await;
    }

    /// Like `mock_rpc`, but only for calls addressed to `contract`.
    async fn mock_call_to(&self, contract: &str, signature: &str, result: String) {
        Mock::given(method("POST"))
            .and(body_string_contains(hex::encode(selector(signature))))
            .and(body_string_contains(contract))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "jsonrpc": "2.0", "id": 1, "result": result
            })))
            .mount(&self.rpc)
            .await;
    }
}

fn signer() -> Arc<SoftwareSigner> {
    Arc::new(SoftwareSigner::generate().unwrap())
}

fn word(address: &str) -> String {
    format!("{}{}", "0".repeat(24), address.trim_start_matches("0x"))
}

#[tokio::test]
async fn fresh_signature_is_verified_and_written() {
    let h = Harness::start().await;
    h.accept_profile_writes().await;
    let key = signer();
    let active = *key.address();
    let wallet = h.wallet(key);
    let service = h.service(active, wallet.clone());

    service
        .submit_profile(
            &ProfileForm::new("Jane", "Keeps the lights on"),
            &CancellationToken::new(),
        )
        .await
        .unwrap();

    assert_eq!(wallet.signs.load(Ordering::SeqCst), 1);
    let writes = h.profile_writes().await;
    assert_eq!(writes.len(), 1);
    assert_eq!(writes[0]["ethereumAccountAddress"], active.to_string());
    assert_eq!(writes[0]["name"], "Jane");
    assert_eq!(writes[0]["description"], "Keeps the lights on");

    let signature: Signature = writes[0]["signature"].as_str().unwrap().parse().unwrap();
    assert_eq!(
        recover_personal_signature(CHALLENGE_MESSAGE.as_bytes(), &signature).unwrap(),
        active
    );
}

#[tokio::test]
async fn signature_cached_by_previous_account_is_refused() {
    let h = Harness::start().await;
    h.accept_profile_writes().await;

    let previous = signer();
    let previous_address = *previous.address();
    h.service(previous_address, h.wallet(previous))
        .submit_profile(&ProfileForm::new("Bob", ""), &CancellationToken::new())
        .await
        .unwrap();

    let current = signer();
    let current_address = *current.address();
    let wallet = h.wallet(current);
    let err = h
        .service(current_address, wallet.clone())
        .submit_profile(&ProfileForm::new("Alice", ""), &CancellationToken::new())
        .await
        .unwrap_err();

    match err {
        ProfileError::Auth(AuthError::SignatureMismatch { active, recovered }) => {
            assert_eq!(active, current_address.to_string());
            assert_eq!(recovered, previous_address.to_string());
        }
        other => panic!("expected SignatureMismatch, got {other:?}"),
    }
    assert_eq!(wallet.signs.load(Ordering::SeqCst), 0);
    assert_eq!(h.profile_writes().await.len(), 1);
}

#[tokio::test]
async fn forgetting_the_signature_recovers_after_account_switch() {
    let h = Harness::start().await;
    h.accept_profile_writes().await;

    let previous = signer();
    h.service(*previous.address(), h.wallet(previous.clone()))
        .submit_profile(&ProfileForm::new("Bob", ""), &CancellationToken::new())
        .await
        .unwrap();

    let current = signer();
    let service = h.service(*current.address(), h.wallet(current));
    service.forget_signature().unwrap();
    service
        .submit_profile(&ProfileForm::new("Alice", ""), &CancellationToken::new())
        .await
        .unwrap();

    let writes = h.profile_writes().await;
    assert_eq!(writes.len(), 2);
    assert_eq!(writes[1]["name"], "Alice");
}

#[tokio::test]
async fn cached_signature_is_reused_for_repeat_edits() {
    let h = Harness::start().await;
    h.accept_profile_writes().await;
    let key = signer();
    let wallet = h.wallet(key.clone());
    let service = h.service(*key.address(), wallet.clone());
    let cancel = CancellationToken::new();

    service
        .submit_profile(&ProfileForm::new("Jane", ""), &cancel)
        .await
        .unwrap();
    service
        .submit_profile(&ProfileForm::new("Jane", "Second edit"), &cancel)
        .await
        .unwrap();

    assert_eq!(wallet.signs.load(Ordering::SeqCst), 1);
    let writes = h.profile_writes().await;
    assert_eq!(writes.len(), 2);
    assert_eq!(writes[0]["signature"], writes[1]["signature"]);
    assert!(h.cache.get("signature").unwrap().is_some());
}

#[tokio::test]
async fn rejected_write_is_reported() {
    let h = Harness::start().await;
    Mock::given(method("POST"))
        .and(path("/api/accounts"))
        .and(body_partial_json(json!({ "name": "Jane" })))
        .respond_with(ResponseTemplate::new(403).set_body_string("signature not accepted"))
        .mount(&h.api)
        .await;
    let key = signer();
    let service = h.service(*key.address(), h.wallet(key));

    let err = service
        .submit_profile(&ProfileForm::new("Jane", ""), &CancellationToken::new())
        .await
        .unwrap_err();
    match err {
        ProfileError::Auth(AuthError::StoreRejected(msg)) => assert!(msg.contains("403"), "{msg}"),
        other => panic!("expected StoreRejected, got {other:?}"),
    }
}

#[tokio::test]
async fn invalid_form_never_reaches_the_wallet() {
    let h = Harness::start().await;
    let key = signer();
    let wallet = h.wallet(key.clone());
    let service = h.service(*key.address(), wallet.clone());

    let err = service
        .submit_profile(&ProfileForm::new("Jane", "x".repeat(151)), &CancellationToken::new())
        .await
        .unwrap_err();
    assert!(matches!(err, ProfileError::InvalidForm(_)));
    assert_eq!(wallet.signs.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn second_submission_while_signing_is_refused() {
    let h = Harness::start().await;
    let key = signer();
    let service = h.service(*key.address(), Arc::new(UnansweredWallet));
    let form = ProfileForm::new("Jane", "");
    let cancel = CancellationToken::new();

    let (first, second) = tokio::join!(service.submit_profile(&form, &cancel), async {
        tokio::task::yield_now().await;
        let result = service.submit_profile(&form, &CancellationToken::new()).await;
        cancel.cancel();
        result
    });

    assert!(matches!(second, Err(ProfileError::SubmissionInFlight)));
    assert!(matches!(
        first,
        Err(ProfileError::Auth(AuthError::ProviderUnavailable(_)))
    ));

    // The flag is released once the first submission ends.
    let again = CancellationToken::new();
    again.cancel();
    let err = service.submit_profile(&form, &again).await.unwrap_err();
    assert!(matches!(
        err,
        ProfileError::Auth(AuthError::ProviderUnavailable(_))
    ));
}

#[tokio::test]
async fn default_balances_resolve_both_values() {
    let h = Harness::start().await;
    h.mock_rpc("eth_getBalance".into(), "0x1bc16d674ec80000".into())
        .await;
    h.mock_rpc(
        hex::encode(selector("stakingToken()")),
        format!("0x{}", word(STAKING_TOKEN)),
    )
    .await;
    h.mock_rpc(
        hex::encode(selector("balanceOf(address)")),
        format!("0x{:064x}", 250_000_000_000_000_000u128),
    )
    .await;

    let key = signer();
    let service = h.service(*key.address(), h.wallet(key));
    let pair = service.balances(None).await.unwrap();
    assert_eq!(pair.native, 2_000_000_000_000_000_000);
    assert_eq!(pair.secondary, 250_000_000_000_000_000);
    assert_eq!(pair.native_display(), "2");
    assert_eq!(pair.secondary_display(), "0.25");
}

#[tokio::test]
async fn organization_without_staking_token_yields_nothing() {
    let h = Harness::start().await;
    h.mock_rpc("eth_getBalance".into(), "0x1".into()).await;
    h.mock_rpc(
        hex::encode(selector("getParametersFromController(address)")),
        format!("0x{}", "ab".repeat(32)),
    )
    .await;
    h.mock_rpc(
        hex::encode(selector("parameters(bytes32)")),
        format!(
            "0x{}{}{}",
            "0".repeat(64),
            "cd".repeat(32),
            word("0x0000000000000000000000000000000000000020")
        ),
    )
    .await;
    h.mock_rpc(
        hex::encode(selector("stakingToken()")),
        format!("0x{}", "0".repeat(64)),
    )
    .await;

    let key = signer();
    let service = h.service(*key.address(), h.wallet(key));
    let org =
        OrganizationContext::new("0x0000000000000000000000000000000000000040".parse().unwrap());

    let err = service.balances(Some(&org)).await.unwrap_err();
    match err {
        ProfileError::Balance(BalanceError::ResolutionFailed(msg)) => {
            assert!(msg.contains("staking token"), "{msg}");
        }
        other => panic!("expected ResolutionFailed, got {other:?}"),
    }
}

#[tokio::test]
async fn organization_balances_show_reputation_score() {
    const ORG_TOKEN: &str = "0x0000000000000000000000000000000000000021";
    const REPUTATION: &str = "0x0000000000000000000000000000000000000050";
    let h = Harness::start().await;
    h.mock_rpc("eth_getBalance".into(), "0xde0b6b3a7640000".into()).await;
    h.mock_rpc(
        hex::encode(selector("getParametersFromController(address)")),
        format!("0x{}", "ab".repeat(32)),
    )
    .await;
    h.mock_rpc(
        hex::encode(selector("parameters(bytes32)")),
        format!(
            "0x{}{}{}",
            "0".repeat(64),
            "cd".repeat(32),
            word("0x0000000000000000000000000000000000000020")
        ),
    )
    .await;
    h.mock_rpc(
        hex::encode(selector("stakingToken()")),
        format!("0x{}", word(ORG_TOKEN)),
    )
    .await;
    h.mock_call_to(
        ORG_TOKEN,
        "balanceOf(address)",
        format!("0x{:064x}", 3_000_000_000_000_000_000u128),
    )
    .await;
    h.mock_rpc(
        hex::encode(selector("nativeReputation()")),
        format!("0x{}", word(REPUTATION)),
    )
    .await;
    h.mock_call_to(
        REPUTATION,
        "balanceOf(address)",
        format!("0x{:064x}", 10_000_000_000_000_000_000u128),
    )
    .await;
    h.mock_call_to(
        REPUTATION,
        "totalSupply()",
        format!("0x{:064x}", 40_000_000_000_000_000_000u128),
    )
    .await;

    let key = signer();
    let service = h.service(*key.address(), h.wallet(key));
    let cancel = CancellationToken::new();
    let cmd = Command::parse("balances 0x0000000000000000000000000000000000000040").unwrap();

    let out = cmd.execute(&service, None, false, &cancel).await.unwrap();
    assert_eq!(out, "  GEN: 3\n  ETH: 1\n  Rep. Score: 25.00% (10 of 40)");

    let out = cmd.execute(&service, None, true, &cancel).await.unwrap();
    let json: serde_json::Value = serde_json::from_str(&out).unwrap();
    assert_eq!(json["staking_token"], "3");
    assert_eq!(json["reputation"]["score"], "25.00%");
    assert_eq!(json["reputation"]["total_wei"], "40000000000000000000");

    // Without an organization there is no reputation to report.
    let out = Command::parse("balances")
        .unwrap()
        .execute(&service, None, true, &cancel)
        .await
        .unwrap();
    let json: serde_json::Value = serde_json::from_str(&out).unwrap();
    assert!(json["reputation"].is_null());
}

#[tokio::test]
async fn native_balance_failure_discards_token_balance() {
    let h = Harness::start().await;
    Mock::given(method("POST"))
        .and(body_string_contains("eth_getBalance"))
        .respond_with(ResponseTemplate::new(502))
        .mount(&h.rpc)
        .await;
    h.mock_rpc(
        hex::encode(selector("stakingToken()")),
        format!("0x{}", word(STAKING_TOKEN)),
    )
    .await;
    h.mock_rpc(
        hex::encode(selector("balanceOf(address)")),
        format!("0x{:064x}", 1u128),
    )
    .await;

    let key = signer();
    let service = h.service(*key.address(), h.wallet(key));
    let err = service.balances(None).await.unwrap_err();
    assert!(matches!(
        err,
        ProfileError::Balance(BalanceError::ResolutionFailed(_))
    ));
}

#[tokio::test]
async fn commands_drive_the_service() {
    let h = Harness::start().await;
    h.accept_profile_writes().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(404))
        .mount(&h.api)
        .await;
    let key = signer();
    let active = *key.address();
    let service = h.service(active, h.wallet(key));
    let cancel = CancellationToken::new();

    let out = Command::parse("address")
        .unwrap()
        .execute(&service, None, false, &cancel)
        .await
        .unwrap();
    assert_eq!(out, active.to_string());

    let out = Command::parse("profile")
        .unwrap()
        .execute(&service, None, false, &cancel)
        .await
        .unwrap();
    assert!(out.contains("No profile set"));

    let out = Command::parse("set_profile Jane Doe | Treasury")
        .unwrap()
        .execute(&service, None, true, &cancel)
        .await
        .unwrap();
    let json: serde_json::Value = serde_json::from_str(&out).unwrap();
    assert_eq!(json["status"], "updated");
    assert_eq!(json["name"], "Jane Doe");
    assert_eq!(h.profile_writes().await[0]["description"], "Treasury");

    let out = Command::parse("forget_signature")
        .unwrap()
        .execute(&service, None, false, &cancel)
        .await
        .unwrap();
    assert!(out.contains("removed"));
    assert_eq!(h.cache.get("signature").unwrap(), None);
}
