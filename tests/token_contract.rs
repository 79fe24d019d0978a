//! Deployment and transaction scenarios for the token contract handle.
//! Every test deploys a fresh token, as a contract test runner would.

use token_ledger::config::TokenConfig;
use token_ledger::{dev_signers, Address, LedgerError, Signer, Token, NOT_ENOUGH_TOKENS};

struct Fixture {
    token: Token,
    owner: Signer,
    addr1: Signer,
    addr2: Signer,
    addrs: Vec<Signer>,
}

fn deploy() -> Fixture {
    let mut signers = dev_signers("token-dev", 6).into_iter();
    let owner = signers.next().unwrap();
    let addr1 = signers.next().unwrap();
    let addr2 = signers.next().unwrap();
    let addrs: Vec<Signer> = signers.collect();
    let token = Token::deploy(&owner, &TokenConfig::default()).unwrap();
    Fixture {
        token,
        owner,
        addr1,
        addr2,
        addrs,
    }
}

mod deployment {
    use super::*;

    #[test]
    fn sets_the_right_owner() {
        let f = deploy();
        assert_eq!(f.token.owner(), f.owner.address());
    }

    #[test]
    fn assigns_total_supply_to_owner() {
        let f = deploy();
        let owner_balance = f.token.balance_of(&f.owner.address());
        assert_eq!(f.token.total_supply(), owner_balance);
        assert_eq!(owner_balance, 1_000_000);
        for other in [&f.addr1, &f.addr2].into_iter().chain(f.addrs.iter()) {
            assert_eq!(f.token.balance_of(&other.address()), 0);
        }
    }
}

mod transactions {
    use super::*;

    #[test]
    fn transfers_tokens_between_accounts() {
        let f = deploy();

        f.token.transfer(&f.addr1.address(), 50).unwrap();
        assert_eq!(f.token.balance_of(&f.addr1.address()), 50);
        assert_eq!(f.token.balance_of(&f.owner.address()), 999_950);

        f.token
            .connect(&f.addr1)
            .transfer(&f.addr2.address(), 50)
            .unwrap();
        assert_eq!(f.token.balance_of(&f.addr2.address()), 50);
        assert_eq!(f.token.balance_of(&f.addr1.address()), 0);
    }

    #[test]
    fn fails_if_sender_lacks_tokens() {
        let f = deploy();
        let initial_owner_balance = f.token.balance_of(&f.owner.address());

        let err = f
            .token
            .connect(&f.addr1)
            .transfer(&f.owner.address(), 1)
            .unwrap_err();
        assert!(matches!(err, LedgerError::InsufficientBalance { .. }));
        assert_eq!(err.reason(), NOT_ENOUGH_TOKENS);
        assert_eq!(err.to_string(), "Not enough tokens");

        assert_eq!(
            f.token.balance_of(&f.owner.address()),
            initial_owner_balance
        );
    }

    #[test]
    fn updates_balances_after_transfers() {
        let f = deploy();
        let initial_owner_balance = f.token.balance_of(&f.owner.address());

        f.token.transfer(&f.addr1.address(), 100).unwrap();
        f.token.transfer(&f.addr2.address(), 50).unwrap();

        assert_eq!(
            f.token.balance_of(&f.owner.address()),
            initial_owner_balance - 150
        );
        assert_eq!(f.token.balance_of(&f.addr1.address()), 100);
        assert_eq!(f.token.balance_of(&f.addr2.address()), 50);
    }

    #[test]
    fn rejected_transfer_changes_no_balance() {
        let f = deploy();
        f.token.transfer(&f.addr1.address(), 30).unwrap();
        let before = f.token.snapshot();

        f.token
            .connect(&f.addr1)
            .transfer(&f.addr2.address(), 31)
            .unwrap_err();
        assert_eq!(f.token.snapshot(), before);
    }

    #[test]
    fn unknown_recipient_gets_an_entry() {
        let f = deploy();
        let fresh = Address::new([0x42; 20]);
        f.token.transfer(&fresh, 7).unwrap();
        assert_eq!(f.token.balance_of(&fresh), 7);
        assert_eq!(f.token.snapshot().balances.get(&fresh), Some(&7));
    }
}
