use std::io::Write;

use assert_cmd::Command;
use predicates as pred;
use tempfile::NamedTempFile;

#[test]
fn end_to_end_outputs_expected_balances() {
    // Prepare a temporary journal that yields
    // tenant 1: 70.0003 available, 0 held (hold placed then released)
    // tenant 2: 40.0001 available, 0 held (hold committed to a withdrawal)
    // plus three rejected rows that must land in the DLQ, not the balances.
    let mut file = NamedTempFile::new().expect("create temp file");
    writeln!(
        file,
        "tenant, kind, reference, amount\n\
    1, credit_fee, fee-1, 100.0003\n\
    2, credit_fee, fee-2, 50.0001\n\
    1, debit_usage, usage-1, 30.0\n\
    1, hold, wd-1, 20\n\
    1, hold_release, wd-1,\n\
    2, hold, wd-2, 10\n\
    2, hold_commit, wd-2,\n\
    1, credit_fee, fee-1, 5\n\
    1, chargeback, x-1, 5\n\
    2, debit_usage, usage-2, 999"
    )
    .unwrap();

    let exe = env!("CARGO_BIN_EXE_wallet_engine");
    let mut cmd = Command::new(exe);
    cmd.arg(file.path());

    cmd.assert()
        .success()
        .stdout(pred::str::contains("tenant,available,held,total"))
        .stdout(pred::str::contains("1,70.0003,0.0000,70.0003"))
        .stdout(pred::str::contains("2,40.0001,0.0000,40.0001"))
        .stderr(pred::str::contains("journal DLQ"))
        .stderr(pred::str::contains("already recorded"))
        .stderr(pred::str::contains("Invalid entry kind"))
        .stderr(pred::str::contains("Insufficient funds"));
}

#[test]
fn missing_journal_argument_fails() {
    let exe = env!("CARGO_BIN_EXE_wallet_engine");
    Command::new(exe)
        .assert()
        .failure()
        .stderr(pred::str::contains("usage"));
}
