mod common;

use assert_cmd::cargo_bin;
use assert_cmd::prelude::*;
use common::*;
use predicates::prelude::*;
use std::process::Command;

#[test]
fn test_malformed_rows_are_skipped() {
    let script = write_raw_script(
        "command, currency, amount, reference, receiver, description\n\
         block, USD, 10, , ,\n\
         transfer, USD, 10, , ,\n\
         block, USD, not_a_number, , ,\n\
         block, USD, 15, , ,\n",
    );

    let mut cmd = Command::new(cargo_bin!("fiatpay"));
    cmd.arg(script.path()).args(["--balance", "USD=100"]);

    cmd.assert()
        .success()
        .stderr(predicate::str::contains("Error reading command"))
        .stdout(predicate::str::contains("block,ok,1 available=90"))
        .stdout(predicate::str::contains("block,ok,2 available=75"));
}

#[test]
fn test_missing_columns_become_error_rows() {
    let script = write_script(&[
        ["block", "", "10", "", "", ""],
        ["pay", "USD", "10", "", RECEIVER, ""],
        ["find", "", "", "", "", ""],
        ["pay", "USD", "10", "abc", RECEIVER, ""],
    ]);

    let mut cmd = Command::new(cargo_bin!("fiatpay"));
    cmd.arg(script.path()).args(["--balance", "USD=100"]);

    cmd.assert()
        .success()
        .stdout(predicate::str::contains("block,error,Validation error: Missing currency"))
        .stdout(predicate::str::contains("pay,error,Validation error: Missing reference"))
        .stdout(predicate::str::contains("find,error,Validation error: Missing reference"))
        .stdout(predicate::str::contains("pay,error,"));
}

#[test]
fn test_non_positive_amounts_are_rejected() {
    let script = write_script(&[
        ["block", "USD", "0", "", "", ""],
        ["block", "USD", "-5", "", "", ""],
    ]);

    let mut cmd = Command::new(cargo_bin!("fiatpay"));
    cmd.arg(script.path()).args(["--balance", "USD=100"]);

    cmd.assert()
        .success()
        .stdout(predicate::str::contains("block,error,\"Validation error: Amount must be positive").count(2));
}

#[test]
fn test_missing_input_file_fails() {
    let mut cmd = Command::new(cargo_bin!("fiatpay"));
    cmd.arg("does-not-exist.csv");

    cmd.assert().failure();
}

#[test]
fn test_invalid_balance_argument_fails() {
    let script = write_script(&[["account", "", "", "", "", ""]]);

    let mut cmd = Command::new(cargo_bin!("fiatpay"));
    cmd.arg(script.path()).args(["--balance", "DOLLARS"]);

    cmd.assert()
        .failure()
        .stderr(predicate::str::contains("expected CURRENCY=AMOUNT"));
}

#[test]
fn test_empty_script_produces_no_output() {
    let script = write_script(&[]);

    let mut cmd = Command::new(cargo_bin!("fiatpay"));
    cmd.arg(script.path());

    cmd.assert()
        .success()
        .stdout(predicate::str::is_empty());
}
