use anchor_lang::prelude::Pubkey;
use governance_power::multiplier::SECS_PER_YEAR;
use governance_power::*;
use program_test::*;

mod program_test;

#[test]
fn test_unlocked_native_deposit() {
    init_logger();
    let w = Pubkey::new_unique();
    let voter = VoterCookie::new(w).deposit(0, DepositCookie::unlocked(200_000));
    let accounts = decode_all(&[voter]);

    let summary = aggregator().aggregate(&accounts, &w, START).unwrap();
    assert_eq!(summary.native_power, 200_000.0);
    assert_eq!(summary.delegated_power, 0.0);
    assert_eq!(summary.total_power, 200_000.0);
    assert_eq!(summary.contributing_accounts, vec![accounts[0].address]);
}

#[test]
fn test_delegated_deposit_counts_for_both_sides() {
    init_logger();
    let x = Pubkey::new_unique();
    let w = Pubkey::new_unique();
    let voter = VoterCookie::delegated(x, w).deposit(0, DepositCookie::unlocked(50_000));
    let accounts = decode_all(&[voter]);
    let aggregator = aggregator();

    let for_w = aggregator.aggregate(&accounts, &w, START).unwrap();
    assert_eq!(for_w.native_power, 0.0);
    assert_eq!(for_w.delegated_power, 50_000.0);
    assert_eq!(for_w.total_power, 50_000.0);

    let for_x = aggregator.aggregate(&accounts, &x, START).unwrap();
    assert_eq!(for_x.native_power, 50_000.0);
    assert_eq!(for_x.delegated_power, 0.0);
}

#[test]
fn test_phantom_marker_is_ignored() {
    init_logger();
    let w = Pubkey::new_unique();
    let voter = VoterCookie::new(w)
        .deposit(0, DepositCookie::unlocked(1_000))
        .deposit(1, DepositCookie::unlocked(300));
    let accounts = decode_all(&[voter]);

    let summary = aggregator().aggregate(&accounts, &w, START).unwrap();
    assert_eq!(summary.native_power, 300.0);
    assert_eq!(summary.native_deposits.len(), 1);

    // a lone phantom leaves the wallet with nothing
    let lone = decode_all(&[VoterCookie::new(w).tail_amount(2672, 11_000 * UNIT)]);
    let summary = aggregator().aggregate(&lone, &w, START).unwrap();
    assert_eq!(summary.total_power, 0.0);
}

#[test]
fn test_cliff_saturation_and_expiry() {
    init_logger();
    let w = Pubkey::new_unique();
    let window = (5 * SECS_PER_YEAR) as i64;
    let voter = VoterCookie::new(w).deposit(0, DepositCookie::cliff(100, START, START + window));
    let accounts = decode_all(&[voter]);
    let aggregator = aggregator();

    let locked = aggregator.aggregate(&accounts, &w, START).unwrap();
    assert_eq!(locked.native_deposits[0].multiplier, 4.0);
    assert_eq!(locked.native_power, 400.0);

    let expired = aggregator
        .aggregate(&accounts, &w, START + window + DAY)
        .unwrap();
    assert_eq!(expired.native_deposits[0].multiplier, 1.0);
    assert_eq!(expired.native_power, 100.0);
}

#[test]
fn test_self_delegation_counts_once() {
    init_logger();
    let w = Pubkey::new_unique();
    let voter = VoterCookie::delegated(w, w).deposit(0, DepositCookie::unlocked(750));
    let accounts = decode_all(&[voter]);

    let summary = aggregator().aggregate(&accounts, &w, START).unwrap();
    assert_eq!(summary.native_power, 750.0);
    assert_eq!(summary.delegated_power, 0.0);
    assert_eq!(summary.contributing_accounts.len(), 1);
}

#[test]
fn test_no_account_in_both_buckets() {
    init_logger();
    let w = Pubkey::new_unique();
    let x = Pubkey::new_unique();
    let cookies = vec![
        VoterCookie::new(w).deposit(0, DepositCookie::unlocked(10)),
        VoterCookie::delegated(w, x).deposit(0, DepositCookie::unlocked(20)),
        VoterCookie::delegated(x, w).deposit(0, DepositCookie::unlocked(40)),
        VoterCookie::delegated(x, x).deposit(0, DepositCookie::unlocked(80)),
    ];
    let accounts = decode_all(&cookies);

    for wallet in [w, x] {
        let summary = aggregator().aggregate(&accounts, &wallet, START).unwrap();
        for record in &accounts {
            let classification = classify(record, &wallet);
            let listed = summary.contributing_accounts.contains(&record.address);
            assert_eq!(listed, classification != Classification::Irrelevant);
        }
        let native_powers: Vec<_> = summary.native_deposits.iter().map(|d| d.power).collect();
        let delegated_powers: Vec<_> = summary.delegated_deposits.iter().map(|d| d.power).collect();
        assert_eq!(native_powers.len() + delegated_powers.len(), summary.contributing_accounts.len());
    }

    let for_w = aggregator().aggregate(&accounts, &w, START).unwrap();
    assert_eq!(for_w.native_power, 30.0);
    assert_eq!(for_w.delegated_power, 40.0);
    let for_x = aggregator().aggregate(&accounts, &x, START).unwrap();
    assert_eq!(for_x.native_power, 120.0);
    assert_eq!(for_x.delegated_power, 20.0);
}

#[test]
fn test_conservation_with_mixed_lockups() {
    init_logger();
    let w = Pubkey::new_unique();
    let cookies = vec![
        VoterCookie::new(w)
            .deposit(0, DepositCookie::unlocked(1_234))
            .deposit(1, DepositCookie::cliff(777, START - 30 * DAY, START + 400 * DAY))
            .deposit(5, DepositCookie::daily(321, START - 10 * DAY, 90)),
        VoterCookie::delegated(Pubkey::new_unique(), w)
            .deposit(2, DepositCookie::cliff(99, START, START + 3 * DAY)),
    ];
    let accounts = decode_all(&cookies);

    let summary = aggregator().aggregate(&accounts, &w, START).unwrap();
    assert_eq!(
        summary.total_power,
        summary.native_power + summary.delegated_power
    );
    let native_sum: f64 = summary.native_deposits.iter().map(|d| d.power).sum();
    assert_close(summary.native_power, native_sum);
    assert!(summary.native_deposits.iter().all(|d| d.multiplier >= 1.0));
    assert!(summary.delegated_power > 99.0);
}

#[test]
fn test_aggregation_is_deterministic() {
    init_logger();
    let w = Pubkey::new_unique();
    let cookies: Vec<_> = (0..12)
        .map(|i| {
            let authority = if i % 3 == 0 { w } else { Pubkey::new_unique() };
            let proxy = if i % 2 == 0 { w } else { authority };
            VoterCookie::delegated(authority, proxy)
                .deposit(0, DepositCookie::cliff(3 + i, START - DAY, START + (i as i64 + 1) * 37 * DAY))
                .deposit(1, DepositCookie::unlocked(17 * (i + 1)))
        })
        .collect();
    let accounts = decode_all(&cookies);

    let first = aggregator().aggregate(&accounts, &w, START).unwrap();
    let second = aggregator().aggregate(&accounts, &w, START).unwrap();
    assert_eq!(first, second);
    assert_eq!(first.total_power.to_bits(), second.total_power.to_bits());
    assert_eq!(first.native_power.to_bits(), second.native_power.to_bits());
}

#[test]
fn test_tail_amount_matching_slot_is_not_double_counted() {
    init_logger();
    let w = Pubkey::new_unique();
    let voter = VoterCookie::new(w)
        .deposit(0, DepositCookie::unlocked(5_000))
        .tail_amount(2672, 5_000 * UNIT)
        .tail_amount(2680, 123 * UNIT);
    let accounts = decode_all(&[voter]);

    let summary = aggregator().aggregate(&accounts, &w, START).unwrap();
    assert_eq!(summary.native_power, 5_000.0);
    assert_eq!(
        summary.warnings,
        vec![DecodeWarning::DecodeAmbiguity {
            account: accounts[0].address,
            offset: 2680,
            amount_native: 123 * UNIT,
        }]
    );
}

#[test]
fn test_tail_amounts_are_fallback_without_slots() {
    init_logger();
    let w = Pubkey::new_unique();
    let voter = VoterCookie::new(w)
        .tail_amount(2672, 2_500 * UNIT)
        .tail_amount(2688, 2_500 * UNIT)
        .tail_amount(2704, 1_700_000_000);
    let accounts = decode_all(&[voter]);

    // the word at 2704 is the evaluation time itself, not 1700 tokens
    let summary = aggregator().aggregate(&accounts, &w, START).unwrap();
    assert_eq!(summary.native_power, 2_500.0);
    assert_eq!(summary.native_deposits.len(), 1);
    assert!(summary.warnings.is_empty());
}

#[test]
fn test_tail_word_equal_to_lockup_end_is_not_an_amount() {
    init_logger();
    let w = Pubkey::new_unique();
    let end_ts = START + 20 * SECS_PER_YEAR as i64;
    let voter = VoterCookie::new(w)
        .deposit(0, DepositCookie::cliff(40, START - DAY, end_ts))
        .tail_amount(2672, end_ts as u64);
    let accounts = decode_all(&[voter]);
    assert_eq!(accounts[0].candidates.len(), 2);

    let summary = aggregator().aggregate(&accounts, &w, START).unwrap();
    assert!(summary.warnings.is_empty());
    assert_eq!(summary.native_deposits.len(), 1);
    // fully saturated cliff
    assert_close(summary.native_power, 40.0 * 4.0);
}

#[test]
fn test_lone_timestamp_tail_gives_no_power() {
    init_logger();
    let w = Pubkey::new_unique();
    let voter = VoterCookie::new(w).tail_amount(2696, (START + 365 * DAY) as u64);
    let accounts = decode_all(&[voter]);

    let summary = aggregator().aggregate(&accounts, &w, START).unwrap();
    assert_eq!(summary.total_power, 0.0);
    assert!(summary.native_deposits.is_empty());
    assert!(summary.warnings.is_empty());
}

#[test]
fn test_dedupe_twice_is_noop_on_decoded_record() {
    let w = Pubkey::new_unique();
    let voter = VoterCookie::new(w)
        .deposit(0, DepositCookie::unlocked(1_000))
        .deposit(1, DepositCookie::unlocked(64))
        .deposit(2, DepositCookie::unlocked(64))
        .tail_amount(2672, 64 * UNIT)
        .tail_amount(2680, 9 * UNIT);
    let record = &decode_all(&[voter])[0];
    let dedup = test_config().deduplicator().unwrap();

    let once = dedup.dedupe(&record.candidates, START);
    assert_eq!(dedup.dedupe(&once, START), once);
    // equal slots stay separate, the matching tail word does not
    let amounts: Vec<_> = once.iter().map(|c| c.entry.amount_native).collect();
    assert_eq!(amounts, vec![64 * UNIT, 64 * UNIT, 9 * UNIT]);
}
