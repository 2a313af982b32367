//! 转账流水线测试
//!
//! 覆盖：
//! - ✅ 预检（地址 / 金额 / 余额 / 合约可达）
//! - ✅ 提交与回执（成功 / 无回执 / revert）
//! - ✅ 执行阶段错误分类
//! - ✅ 成功后的购买记录

mod common;

use common::*;
use ethers::types::U256;
use tokenpay::{
    domain::{PurchaseContact, PurchaseRecord, TransferOutcome, TransferRequest},
    error::ChainError,
    repository::{InMemoryPurchaseRepository, PurchaseRepository},
    service::{contract_probe, FailureReason, TransferReceipt},
};
use tokio_test::{assert_err, assert_ok};

fn request(amount: &str) -> TransferRequest {
    TransferRequest::parse(SENDER, RECIPIENT, amount).unwrap()
}

fn failure(outcome: &TransferOutcome) -> (FailureReason, String) {
    match outcome {
        TransferOutcome::Failure { reason, message } => (*reason, message.clone()),
        other => panic!("expected failure, got {:?}", other),
    }
}

// ============ 预检 ============

#[tokio::test]
async fn test_insufficient_balance_never_submits() {
    let (token, _wallet, mut executor) = setup(MockToken::new().with_balance(units("10", 18)));
    let req = request("12.5");

    let result = executor.validate(&req).await;
    assert!(!result.valid);
    assert_eq!(result.reason, Some(FailureReason::InsufficientBalance));
    assert_eq!(
        result.error.as_deref(),
        Some("Insufficient balance. Required: 12.5 DAN, Available: 10 DAN")
    );

    let outcome = executor.transfer(&req).await;
    let (reason, _) = failure(&outcome);
    assert_eq!(reason, FailureReason::InsufficientBalance);
    assert_eq!(token.count("transfer"), 0);
    assert_eq!(token.count("estimate_transfer_gas"), 0);
}

#[tokio::test]
async fn test_valid_request_passes_preflight() {
    let (token, _wallet, mut executor) = setup(MockToken::new());

    let result = executor.validate(&request("12.5")).await;
    assert!(result.valid);
    assert!(result.error.is_none());

    // 余额 + 可达性两次只读调用，不发起写操作
    assert_eq!(token.count("balance_of"), 2);
    assert_eq!(token.count("transfer"), 0);
}

#[tokio::test]
async fn test_malformed_addresses_name_the_field() {
    let (token, _wallet, mut executor) = setup(MockToken::new());

    let cases = [
        (SENDER, BAD_CHECKSUM, "Invalid to address"),
        (SENDER, "0x301a9B960F8bbD74609c51868d6bD1a27Ed2D7", "Invalid to address"),
        ("0x5aAeb6053F3E94C9b9A09f33669435E7Ef1BeAe", RECIPIENT, "Invalid from address"),
        ("not an address", RECIPIENT, "Invalid from address"),
    ];

    for (from, to, message) in cases {
        let req = TransferRequest::parse(from, to, "1").unwrap();
        let result = executor.validate(&req).await;
        assert_eq!(result.reason, Some(FailureReason::InvalidAddress), "{from} -> {to}");
        assert_eq!(result.error.as_deref(), Some(message), "{from} -> {to}");
    }

    assert_eq!(token.count("balance_of"), 0);
}

#[tokio::test]
async fn test_lowercase_addresses_are_accepted() {
    let (_token, _wallet, mut executor) = setup(MockToken::new());
    let req = TransferRequest::parse(SENDER.to_lowercase(), RECIPIENT.to_lowercase(), "1").unwrap();

    assert!(executor.validate(&req).await.valid);
    assert!(executor.transfer(&req).await.is_success());
}

#[tokio::test]
async fn test_zero_amount_is_rejected_before_rpc() {
    let (token, _wallet, mut executor) = setup(MockToken::new());

    let result = executor.validate(&request("0")).await;
    assert_eq!(result.reason, Some(FailureReason::InvalidAmount));
    assert_eq!(token.count("balance_of"), 0);
}

#[tokio::test]
async fn test_balance_query_failure_is_contract_unreachable() {
    let (token, _wallet, mut executor) =
        setup(MockToken::new().with_balance_error(ChainError::new("could not detect network")));

    let outcome = executor.transfer(&request("1")).await;
    let (reason, message) = failure(&outcome);
    assert_eq!(reason, FailureReason::ContractUnreachable);
    assert_eq!(message, "Token contract not accessible");
    assert_eq!(token.count("transfer"), 0);
}

#[tokio::test]
async fn test_reachability_check_failure() {
    let (token, _wallet, mut executor) = setup(
        MockToken::new()
            .then_balance(Ok(units("100", 18)))
            .then_balance(Err(ChainError::new("header not found"))),
    );

    let result = executor.validate(&request("1")).await;
    assert_eq!(result.reason, Some(FailureReason::ContractUnreachable));
    assert_eq!(token.count("balance_of"), 2);
}

#[tokio::test]
async fn test_network_mismatch_short_circuits_transfer() {
    let token = std::sync::Arc::new(MockToken::new());
    let wallet = std::sync::Arc::new(MockWallet::new(token.clone()).on_chain(97));
    let mut executor = executor(wallet);

    let outcome = executor.transfer(&request("1")).await;
    let (reason, message) = failure(&outcome);
    assert_eq!(reason, FailureReason::NetworkMismatch);
    assert_eq!(message, "Please switch to BSC Mainnet");
    assert!(token.calls().is_empty());
}

#[tokio::test]
async fn test_balance_beyond_decimal_range_is_compared_in_raw_units() {
    let (token, _wallet, mut executor) = setup(
        MockToken::new()
            .with_decimals(Ok(0))
            .with_balance(U256::exp10(30)),
    );
    let req = request("1");

    let result = executor.validate(&req).await;
    assert!(result.valid, "{:?}", result);

    let outcome = executor.transfer(&req).await;
    assert!(outcome.is_success());
    assert_eq!(token.transfers(), vec![(addr(RECIPIENT), U256::one())]);
}

#[tokio::test]
async fn test_validate_rejects_foreign_from_address() {
    let (token, _wallet, mut executor) = setup(MockToken::new());
    let req = TransferRequest::parse(RECIPIENT, SENDER, "1").unwrap();

    let result = executor.validate(&req).await;
    assert!(!result.valid);
    assert_eq!(result.reason, Some(FailureReason::InvalidAddress));
    assert_eq!(token.count("balance_of"), 0);
}

#[tokio::test]
async fn test_connection_failure_message_is_generic() {
    let token = std::sync::Arc::new(MockToken::new());
    let wallet = std::sync::Arc::new(MockWallet::new(token.clone()).with_accounts(Err(
        ChainError::new("error sending request for url (https://bsc-dataseed.binance.org/): connection refused"),
    )));
    let mut executor = executor(wallet);

    let outcome = executor.transfer(&request("1")).await;
    assert_eq!(outcome.failure_reason(), Some(FailureReason::WalletUnavailable));
    let (_, message) = failure(&outcome);
    assert_eq!(message, "Wallet connection failed");
    assert!(token.calls().is_empty());
}

#[tokio::test]
async fn test_reset_through_executor_reconnects() {
    let (_token, wallet, mut executor) = setup(MockToken::new());

    assert!(executor.transfer(&request("1")).await.is_success());
    executor.sessions_mut().reset_session();
    assert!(!executor.sessions().state().is_connected());

    assert!(executor.transfer(&request("1")).await.is_success());
    assert!(executor.sessions().state().is_connected());
    assert_eq!(wallet.count("request_accounts"), 2);
}

// ============ 提交与回执 ============

#[tokio::test]
async fn test_successful_transfer_and_purchase_record() {
    let (token, _wallet, mut executor) = setup(MockToken::new());
    let req = request("12.5");

    let outcome = executor.transfer(&req).await;
    assert!(outcome.is_success());
    assert_eq!(
        outcome,
        TransferOutcome::Success {
            transaction_hash: tx_hash(),
            gas_used: U256::from(51_234u64),
        }
    );

    assert_eq!(
        token.transfers(),
        vec![(
            addr(RECIPIENT),
            U256::from_dec_str("12500000000000000000").unwrap()
        )]
    );
    // 同一请求内 decimals() 只查询一次
    assert_eq!(token.count("decimals"), 1);
    assert_eq!(token.count("wait_for_receipt"), 1);

    let contact = PurchaseContact {
        email: Some("buyer@example.com".into()),
        phone_number: "0812345678".into(),
    };
    let record = PurchaseRecord::from_success(&outcome, &req, &contact, dec("200")).unwrap();
    assert!(!record.is_received);
    assert_eq!(record.token_amount, dec("12.5"));

    let repo = InMemoryPurchaseRepository::new();
    assert_ok!(repo.insert(&record).await);
    assert_err!(repo.insert(&record).await);
    assert!(assert_ok!(repo.mark_received(record.id).await));
    assert!(repo.list_recent(10).await.unwrap()[0].is_received);
}

#[tokio::test]
async fn test_missing_receipt_is_distinct_from_revert() {
    let (token, _wallet, mut executor) = setup(MockToken::new().with_receipt(Ok(None)));

    let outcome = executor.transfer(&request("1")).await;
    let (reason, message) = failure(&outcome);
    assert_eq!(reason, FailureReason::ReceiptUnavailable);
    assert_eq!(message, "Transaction receipt not available");
    assert_eq!(token.count("transfer"), 1);
}

#[tokio::test]
async fn test_reverted_receipt_is_contract_revert() {
    let receipt = TransferReceipt {
        status: Some(0),
        ..success_receipt()
    };
    let (_token, _wallet, mut executor) = setup(MockToken::new().with_receipt(Ok(Some(receipt))));

    let (reason, message) = failure(&executor.transfer(&request("1")).await);
    assert_eq!(reason, FailureReason::ContractRevert);
    assert_eq!(message, "Contract call failed: execution reverted");
}

#[tokio::test]
async fn test_gas_estimate_failure_does_not_block() {
    let (token, _wallet, mut executor) = setup(
        MockToken::new().with_gas(Err(ChainError::new("cannot estimate gas; transaction may fail"))),
    );

    let outcome = executor.transfer(&request("1")).await;
    assert!(outcome.is_success());
    assert_eq!(token.count("estimate_transfer_gas"), 1);
    assert_eq!(token.count("transfer"), 1);
}

#[tokio::test]
async fn test_decimals_fallback() {
    let (token, _wallet, mut executor) = setup(
        MockToken::new().with_decimals(Err(ChainError::call_exception("missing revert data", None, None))),
    );

    assert!(executor.transfer(&request("2")).await.is_success());
    assert_eq!(token.transfers()[0].1, units("2", 18));
}

#[tokio::test]
async fn test_non_standard_decimals() {
    let (token, _wallet, mut executor) = setup(
        MockToken::new()
            .with_decimals(Ok(6))
            .with_balance(units("100", 6)),
    );

    assert!(executor.transfer(&request("12.5")).await.is_success());
    assert_eq!(token.transfers()[0].1, U256::from(12_500_000u64));

    // 超出代币精度的金额在提交前被拒绝
    let (reason, _) = failure(&executor.transfer(&request("1.0000001")).await);
    assert_eq!(reason, FailureReason::InvalidAmount);
    assert_eq!(token.count("transfer"), 1);
}

#[tokio::test]
async fn test_from_must_match_connected_account() {
    let (token, _wallet, mut executor) = setup(MockToken::new());
    let req = TransferRequest::parse(RECIPIENT, SENDER, "1").unwrap();

    let (reason, _) = failure(&executor.transfer(&req).await);
    assert_eq!(reason, FailureReason::InvalidAddress);
    assert_eq!(token.count("transfer"), 0);
}

#[tokio::test]
async fn test_execution_errors_are_classified() {
    let cases = [
        (
            "MetaMask Tx Signature: User rejected the transaction.",
            FailureReason::UserCancelled,
            "Transaction cancelled by user",
        ),
        (
            "insufficient funds for gas * price + value",
            FailureReason::InsufficientFunds,
            "Insufficient balance for transaction",
        ),
        (
            "replacement transaction underpriced",
            FailureReason::Unknown,
            "replacement transaction underpriced",
        ),
    ];

    for (raw, expected_reason, expected_message) in cases {
        let (_token, _wallet, mut executor) =
            setup(MockToken::new().with_send(Err(ChainError::new(raw))));
        let (reason, message) = failure(&executor.transfer(&request("1")).await);
        assert_eq!(reason, expected_reason, "{raw}");
        assert_eq!(message, expected_message, "{raw}");
    }

    let (_token, _wallet, mut executor) = setup(MockToken::new().with_send(Err(
        ChainError::call_exception(
            "execution reverted",
            Some("ERC20: transfer amount exceeds balance".into()),
            None,
        ),
    )));
    let (reason, message) = failure(&executor.transfer(&request("1")).await);
    assert_eq!(reason, FailureReason::ContractRevert);
    assert_eq!(
        message,
        "Contract call failed: ERC20: transfer amount exceeds balance"
    );
}

#[tokio::test]
async fn test_failed_transfer_keeps_session() {
    let (_token, wallet, mut executor) =
        setup(MockToken::new().with_send(Err(ChainError::new("User rejected the request."))));

    assert!(!executor.transfer(&request("1")).await.is_success());
    assert!(executor.sessions().state().is_connected());
    assert!(!executor.transfer(&request("1")).await.is_success());
    assert_eq!(wallet.count("request_accounts"), 1);
}

#[tokio::test]
async fn test_balance_and_probe() {
    let (token, _wallet, mut executor) = setup(MockToken::new().with_balance(units("1234.5", 18)));
    assert_eq!(executor.balance().await.unwrap(), dec("1234.5"));

    let probe = contract_probe::probe_contract(token.as_ref(), 18).await;
    assert_eq!(probe.symbol.as_deref(), Some("DAN"));
    assert!(probe.name.is_none());
    assert_eq!(probe.decimals, 18);
    assert!(probe.looks_like_erc20());
}
