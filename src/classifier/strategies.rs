//! Swap-leg extraction strategies.
//!
//! Each strategy is a pure function over the parsed-transaction JSON that
//! either produces both legs of a swap or declines. Strategies are run in
//! priority order by the classifier; the first success wins.
//!
//! Leg orientation: `token_in` is what the wallet spent, `token_out` is what
//! it received.

use serde_json::Value;
use std::collections::HashMap;

use crate::domain::{SwapLeg, SwapLegs, TokenAddress, SOL_MINT};

const TOKEN_EPS: f64 = 1e-12;
const SOL_EPS: f64 = 1e-8;

/// Strategy 1: an explicit `tokensSwapped` block on the first action.
///
/// Enriched parsers attach `actions: [{info: {tokensSwapped: {in, out}}}]`
/// where each side carries a token address, an amount, and usually a symbol.
pub fn strategy_swapped_tokens(tx: &Value) -> Option<SwapLegs> {
    let swapped = tx
        .get("actions")
        .and_then(Value::as_array)
        .and_then(|actions| actions.first())
        .and_then(|action| action.get("info"))
        .and_then(|info| info.get("tokensSwapped"))?;

    let token_in = leg_from_swapped_side(swapped.get("in")?)?;
    let token_out = leg_from_swapped_side(swapped.get("out")?)?;
    Some(SwapLegs {
        token_in,
        token_out,
    })
}

fn leg_from_swapped_side(side: &Value) -> Option<SwapLeg> {
    let address = side
        .get("token_address")
        .or_else(|| side.get("tokenAddress"))
        .and_then(Value::as_str)?;
    let amount = amount_as_f64(side.get("amount")?)?;
    if amount <= 0.0 {
        return None;
    }
    let symbol = side
        .get("symbol")
        .or_else(|| side.get("name"))
        .and_then(Value::as_str)
        .map(ToString::to_string);
    let leg = SwapLeg::new(TokenAddress::new(address.to_string()), amount);
    Some(match symbol {
        Some(symbol) => leg.with_symbol(symbol),
        None => leg,
    })
}

/// Strategy 2: net per-owner balance changes.
///
/// Folds the wallet's pre/post token balances into per-mint deltas, adds the
/// native lamport delta as a pseudo-mint, and succeeds only when exactly one
/// mint decreased and exactly one increased.
pub fn strategy_balance_changes(tx: &Value, wallet: &str) -> Option<SwapLegs> {
    let meta = tx.get("meta")?;
    let mut deltas: HashMap<String, f64> = HashMap::new();

    for item in meta
        .get("preTokenBalances")
        .and_then(Value::as_array)
        .map(Vec::as_slice)
        .unwrap_or_default()
    {
        if item.get("owner").and_then(Value::as_str) == Some(wallet) {
            let mint = item.get("mint").and_then(Value::as_str)?;
            let amount = parse_ui_amount(item.get("uiTokenAmount"))?;
            *deltas.entry(mint.to_string()).or_default() -= amount;
        }
    }
    for item in meta
        .get("postTokenBalances")
        .and_then(Value::as_array)
        .map(Vec::as_slice)
        .unwrap_or_default()
    {
        if item.get("owner").and_then(Value::as_str) == Some(wallet) {
            let mint = item.get("mint").and_then(Value::as_str)?;
            let amount = parse_ui_amount(item.get("uiTokenAmount"))?;
            *deltas.entry(mint.to_string()).or_default() += amount;
        }
    }

    // Native balance moves through preBalances/postBalances, indexed by the
    // wallet's position in accountKeys. Only counted when the token-balance
    // records did not already capture wrapped SOL.
    if deltas.get(SOL_MINT).map(|d| d.abs() <= TOKEN_EPS).unwrap_or(true) {
        if let Some(sol_delta) = native_sol_delta(tx, wallet) {
            if sol_delta.abs() > SOL_EPS {
                *deltas.entry(SOL_MINT.to_string()).or_default() += sol_delta;
            }
        }
    }

    let mut negatives = Vec::new();
    let mut positives = Vec::new();
    for (mint, delta) in &deltas {
        if *delta < -TOKEN_EPS {
            negatives.push((mint.clone(), delta.abs()));
        } else if *delta > TOKEN_EPS {
            positives.push((mint.clone(), *delta));
        }
    }

    if negatives.len() != 1 || positives.len() != 1 {
        return None;
    }
    let (in_mint, in_amount) = negatives.remove(0);
    let (out_mint, out_amount) = positives.remove(0);
    if in_mint == out_mint {
        return None;
    }

    Some(SwapLegs {
        token_in: SwapLeg::new(TokenAddress::new(in_mint), in_amount),
        token_out: SwapLeg::new(TokenAddress::new(out_mint), out_amount),
    })
}

/// Strategy 3: transfer actions involving the wallet.
///
/// Scans `SOL_TRANSFER` and `TOKEN_TRANSFER` actions, keeps the largest leg
/// the wallet sent and the largest it received, and pairs them when they name
/// different tokens.
pub fn strategy_transfers(tx: &Value, wallet: &str) -> Option<SwapLegs> {
    let actions = tx.get("actions").and_then(Value::as_array)?;

    let mut sent: Option<SwapLeg> = None;
    let mut received: Option<SwapLeg> = None;

    for action in actions {
        let kind = action.get("type").and_then(Value::as_str).unwrap_or("");
        let info = match action.get("info") {
            Some(info) => info,
            None => continue,
        };
        let (address, symbol) = match kind {
            "SOL_TRANSFER" => (SOL_MINT.to_string(), Some("SOL".to_string())),
            "TOKEN_TRANSFER" => {
                let address = info
                    .get("token_address")
                    .or_else(|| info.get("tokenAddress"))
                    .and_then(Value::as_str);
                match address {
                    Some(address) => (address.to_string(), None),
                    None => continue,
                }
            }
            _ => continue,
        };
        let amount = match info.get("amount").and_then(amount_as_f64) {
            Some(amount) if amount > 0.0 => amount,
            _ => continue,
        };

        let mut leg = SwapLeg::new(TokenAddress::new(address), amount);
        if let Some(symbol) = symbol {
            leg = leg.with_symbol(symbol);
        }

        if info.get("sender").and_then(Value::as_str) == Some(wallet) {
            replace_if_larger(&mut sent, leg);
        } else if info.get("receiver").and_then(Value::as_str) == Some(wallet) {
            replace_if_larger(&mut received, leg);
        }
    }

    let token_in = sent?;
    let token_out = received?;
    if token_in.token == token_out.token {
        return None;
    }
    Some(SwapLegs {
        token_in,
        token_out,
    })
}

fn replace_if_larger(slot: &mut Option<SwapLeg>, candidate: SwapLeg) {
    match slot {
        Some(existing) if existing.amount >= candidate.amount => {}
        _ => *slot = Some(candidate),
    }
}

/// Account keys appear either as plain strings or as `{pubkey, signer}`
/// objects depending on the encoding requested.
pub fn account_keys(tx: &Value) -> Vec<String> {
    tx.pointer("/transaction/message/accountKeys")
        .and_then(Value::as_array)
        .map(|keys| {
            keys.iter()
                .filter_map(|item| {
                    item.as_str()
                        .or_else(|| item.get("pubkey").and_then(Value::as_str))
                        .map(ToString::to_string)
                })
                .collect()
        })
        .unwrap_or_default()
}

fn native_sol_delta(tx: &Value, wallet: &str) -> Option<f64> {
    let index = account_keys(tx).iter().position(|key| key == wallet)?;
    let meta = tx.get("meta")?;
    let pre = meta
        .get("preBalances")
        .and_then(Value::as_array)
        .and_then(|balances| balances.get(index))
        .and_then(Value::as_u64)? as f64
        / 1_000_000_000.0;
    let post = meta
        .get("postBalances")
        .and_then(Value::as_array)
        .and_then(|balances| balances.get(index))
        .and_then(Value::as_u64)? as f64
        / 1_000_000_000.0;
    Some(post - pre)
}

/// Token amounts arrive as `uiAmount` floats, `uiAmountString`, or a raw
/// amount plus decimals.
pub fn parse_ui_amount(ui_amount: Option<&Value>) -> Option<f64> {
    let ui_amount = ui_amount?;
    if let Some(amount) = ui_amount.get("uiAmountString").and_then(Value::as_str) {
        return amount.parse::<f64>().ok();
    }
    if let Some(amount) = ui_amount.get("uiAmount").and_then(Value::as_f64) {
        return Some(amount);
    }
    let raw = ui_amount.get("amount").and_then(Value::as_str)?;
    let decimals = ui_amount.get("decimals").and_then(Value::as_u64)?;
    if decimals > 18 {
        return None;
    }
    let raw = raw.parse::<f64>().ok()?;
    Some(raw / 10f64.powi(decimals as i32))
}

fn amount_as_f64(value: &Value) -> Option<f64> {
    if let Some(amount) = value.as_f64() {
        return Some(amount);
    }
    value.as_str().and_then(|s| s.parse::<f64>().ok())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    const WALLET: &str = "walletPubkey111";
    const MINT_A: &str = "mintAAA";
    const MINT_B: &str = "mintBBB";

    #[test]
    fn test_swapped_tokens_reads_first_action() {
        let tx = json!({
            "actions": [{
                "type": "SWAP",
                "info": {
                    "tokensSwapped": {
                        "in": {"token_address": SOL_MINT, "amount": 0.5, "symbol": "SOL"},
                        "out": {"token_address": MINT_A, "amount": 1000.0, "symbol": "AAA"}
                    }
                }
            }]
        });

        let legs = strategy_swapped_tokens(&tx).unwrap();
        assert_eq!(legs.token_in.token.as_str(), SOL_MINT);
        assert_eq!(legs.token_in.amount, 0.5);
        assert_eq!(legs.token_out.token.as_str(), MINT_A);
        assert_eq!(legs.token_out.symbol.as_deref(), Some("AAA"));
    }

    #[test]
    fn test_swapped_tokens_declines_without_both_sides() {
        let tx = json!({
            "actions": [{
                "info": {
                    "tokensSwapped": {
                        "in": {"token_address": SOL_MINT, "amount": 0.5}
                    }
                }
            }]
        });
        assert!(strategy_swapped_tokens(&tx).is_none());
    }

    fn balances_tx(pre_a: f64, post_a: f64, pre_lamports: u64, post_lamports: u64) -> Value {
        json!({
            "transaction": {"message": {"accountKeys": [{"pubkey": WALLET}]}},
            "meta": {
                "preTokenBalances": [
                    {"owner": WALLET, "mint": MINT_A,
                     "uiTokenAmount": {"uiAmount": pre_a}}
                ],
                "postTokenBalances": [
                    {"owner": WALLET, "mint": MINT_A,
                     "uiTokenAmount": {"uiAmount": post_a}}
                ],
                "preBalances": [pre_lamports],
                "postBalances": [post_lamports]
            }
        })
    }

    #[test]
    fn test_balance_changes_sol_for_token() {
        // 2 SOL out, 100 of mint A in.
        let tx = balances_tx(0.0, 100.0, 5_000_000_000, 3_000_000_000);
        let legs = strategy_balance_changes(&tx, WALLET).unwrap();
        assert_eq!(legs.token_in.token.as_str(), SOL_MINT);
        assert!((legs.token_in.amount - 2.0).abs() < 1e-9);
        assert_eq!(legs.token_out.token.as_str(), MINT_A);
        assert_eq!(legs.token_out.amount, 100.0);
    }

    #[test]
    fn test_balance_changes_token_for_sol() {
        let tx = balances_tx(100.0, 60.0, 3_000_000_000, 5_000_000_000);
        let legs = strategy_balance_changes(&tx, WALLET).unwrap();
        assert_eq!(legs.token_in.token.as_str(), MINT_A);
        assert_eq!(legs.token_in.amount, 40.0);
        assert_eq!(legs.token_out.token.as_str(), SOL_MINT);
    }

    #[test]
    fn test_balance_changes_requires_exactly_one_each_way() {
        // Two mints decreased: ambiguous, decline.
        let tx = json!({
            "transaction": {"message": {"accountKeys": [WALLET]}},
            "meta": {
                "preTokenBalances": [
                    {"owner": WALLET, "mint": MINT_A, "uiTokenAmount": {"uiAmount": 10.0}},
                    {"owner": WALLET, "mint": MINT_B, "uiTokenAmount": {"uiAmount": 10.0}}
                ],
                "postTokenBalances": [
                    {"owner": WALLET, "mint": MINT_A, "uiTokenAmount": {"uiAmount": 5.0}},
                    {"owner": WALLET, "mint": MINT_B, "uiTokenAmount": {"uiAmount": 5.0}}
                ],
                "preBalances": [5_000_000_000u64],
                "postBalances": [5_000_000_000u64]
            }
        });
        assert!(strategy_balance_changes(&tx, WALLET).is_none());
    }

    #[test]
    fn test_balance_changes_ignores_other_owners() {
        let tx = json!({
            "transaction": {"message": {"accountKeys": [WALLET]}},
            "meta": {
                "preTokenBalances": [
                    {"owner": "someoneElse", "mint": MINT_A, "uiTokenAmount": {"uiAmount": 10.0}}
                ],
                "postTokenBalances": [
                    {"owner": "someoneElse", "mint": MINT_A, "uiTokenAmount": {"uiAmount": 0.0}}
                ],
                "preBalances": [5_000_000_000u64],
                "postBalances": [5_000_000_000u64]
            }
        });
        assert!(strategy_balance_changes(&tx, WALLET).is_none());
    }

    #[test]
    fn test_transfers_pairs_coin_out_token_in() {
        let tx = json!({
            "actions": [
                {"type": "SOL_TRANSFER",
                 "info": {"sender": WALLET, "receiver": "pool", "amount": 1.5}},
                {"type": "TOKEN_TRANSFER",
                 "info": {"sender": "pool", "receiver": WALLET,
                          "token_address": MINT_A, "amount": 300.0}}
            ]
        });

        let legs = strategy_transfers(&tx, WALLET).unwrap();
        assert_eq!(legs.token_in.token.as_str(), SOL_MINT);
        assert_eq!(legs.token_in.amount, 1.5);
        assert_eq!(legs.token_out.token.as_str(), MINT_A);
        assert_eq!(legs.token_out.amount, 300.0);
    }

    #[test]
    fn test_transfers_requires_both_directions() {
        let tx = json!({
            "actions": [
                {"type": "SOL_TRANSFER",
                 "info": {"sender": WALLET, "receiver": "pool", "amount": 1.5}}
            ]
        });
        assert!(strategy_transfers(&tx, WALLET).is_none());
    }

    #[test]
    fn test_transfers_keeps_largest_leg_per_direction() {
        let tx = json!({
            "actions": [
                {"type": "TOKEN_TRANSFER",
                 "info": {"sender": WALLET, "receiver": "pool",
                          "token_address": MINT_A, "amount": 10.0}},
                {"type": "TOKEN_TRANSFER",
                 "info": {"sender": WALLET, "receiver": "fee",
                          "token_address": MINT_A, "amount": 0.1}},
                {"type": "TOKEN_TRANSFER",
                 "info": {"sender": "pool", "receiver": WALLET,
                          "token_address": MINT_B, "amount": 42.0}}
            ]
        });

        let legs = strategy_transfers(&tx, WALLET).unwrap();
        assert_eq!(legs.token_in.amount, 10.0);
        assert_eq!(legs.token_out.token.as_str(), MINT_B);
    }

    #[test]
    fn test_account_keys_handles_both_encodings() {
        let objs = json!({"transaction": {"message": {"accountKeys": [{"pubkey": "a"}, {"pubkey": "b"}]}}});
        assert_eq!(account_keys(&objs), vec!["a", "b"]);

        let strs = json!({"transaction": {"message": {"accountKeys": ["a", "b"]}}});
        assert_eq!(account_keys(&strs), vec!["a", "b"]);
    }

    #[test]
    fn test_parse_ui_amount_variants() {
        assert_eq!(
            parse_ui_amount(Some(&json!({"uiAmount": 1.25}))),
            Some(1.25)
        );
        assert_eq!(
            parse_ui_amount(Some(&json!({"uiAmountString": "2.5"}))),
            Some(2.5)
        );
        assert_eq!(
            parse_ui_amount(Some(&json!({"amount": "1500000", "decimals": 6}))),
            Some(1.5)
        );
        assert_eq!(parse_ui_amount(None), None);
    }
}
