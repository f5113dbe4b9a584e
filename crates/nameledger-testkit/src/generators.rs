//! Proptest generators for property-based testing.

use bytes::Bytes;
use proptest::prelude::*;

use nameledger_core::{
    Address, Encoding, EncodingConfig, Keypair, NameOperation, NameRecord, OutPoint, Script,
    Transaction, TxIn, TxOut, Txid,
};

/// Generate an encoding.
pub fn encoding() -> impl Strategy<Value = Encoding> {
    prop_oneof![Just(Encoding::Ascii), Just(Encoding::Hex), Just(Encoding::Utf8)]
}

/// Generate a pair of encodings.
pub fn encoding_config() -> impl Strategy<Value = EncodingConfig> {
    (encoding(), encoding()).prop_map(|(name, value)| EncodingConfig::new(name, value))
}

/// Generate arbitrary bytes up to `max_len`.
pub fn raw_bytes(max_len: usize) -> impl Strategy<Value = Vec<u8>> {
    prop::collection::vec(any::<u8>(), 0..=max_len)
}

/// Generate bytes every encoding accepts: printable ASCII.
pub fn printable_ascii(max_len: usize) -> impl Strategy<Value = Vec<u8>> {
    prop::collection::vec(0x20u8..0x7f, 0..=max_len)
}

/// Generate UTF-8 text without control characters, non-ASCII included.
pub fn clean_utf8(max_len: usize) -> impl Strategy<Value = String> {
    prop::collection::vec(any::<char>(), 0..=max_len).prop_map(|chars| {
        chars
            .into_iter()
            .filter(|c| !c.is_control())
            .collect::<String>()
    })
}

/// Generate bytes containing at least one byte `ascii` rejects.
pub fn non_ascii(max_len: usize) -> impl Strategy<Value = Vec<u8>> {
    let bad = prop_oneof![Just(0x00u8), Just(0x0au8), Just(0x7fu8), 0x80u8..=0xff];
    (printable_ascii(max_len), bad, any::<prop::sample::Index>()).prop_map(|(mut bytes, bad, at)| {
        let at = at.index(bytes.len() + 1);
        bytes.insert(at, bad);
        bytes
    })
}

/// Generate a name in the `d/` namespace.
pub fn domain_name() -> impl Strategy<Value = String> {
    "d/[a-z][a-z0-9-]{0,30}[a-z0-9]".prop_map(String::from)
}

/// Generate a random Txid.
pub fn txid() -> impl Strategy<Value = Txid> {
    any::<[u8; 32]>().prop_map(Txid::from_bytes)
}

/// Generate an address controlled by a random key.
pub fn address() -> impl Strategy<Value = Address> {
    any::<[u8; 32]>().prop_map(|seed| Address::from_public_key(&Keypair::from_seed(&seed).public_key()))
}

/// Generate a confirmed record with arbitrary name and value bytes.
pub fn name_record() -> impl Strategy<Value = NameRecord> {
    (raw_bytes(64), raw_bytes(128), txid(), 0u32..4, address(), 1u32..100_000).prop_map(
        |(name, value, txid, vout, address, height)| NameRecord {
            name: Bytes::from(name),
            value: Bytes::from(value),
            txid,
            vout,
            address,
            height,
        },
    )
}

/// Generate any of the three name operations.
pub fn name_operation() -> impl Strategy<Value = NameOperation> {
    prop_oneof![
        (any::<[u8; 20]>(), raw_bytes(64))
            .prop_map(|(rand, name)| NameOperation::name_new(&rand, &name)),
        (raw_bytes(64), raw_bytes(128), raw_bytes(20)).prop_map(|(name, value, rand)| {
            NameOperation::NameFirstUpdate {
                name: Bytes::from(name),
                value: Bytes::from(value),
                rand: Bytes::from(rand),
            }
        }),
        (raw_bytes(64), raw_bytes(128)).prop_map(|(name, value)| NameOperation::NameUpdate {
            name: Bytes::from(name),
            value: Bytes::from(value),
        }),
    ]
}

/// Generate a script, with or without a name operation.
pub fn script() -> impl Strategy<Value = Script> {
    (address(), prop::option::of(name_operation())).prop_map(|(address, op)| Script {
        address,
        name_op: op,
    })
}

/// Generate an unsigned transaction with at most one name output.
pub fn transaction() -> impl Strategy<Value = Transaction> {
    (
        prop::collection::btree_set((txid(), 0u32..8), 0..4),
        prop::collection::vec((1u64..1_000_000_000, address()), 1..4),
        prop::option::of(name_operation()),
    )
        .prop_map(|(inputs, payments, name_op)| {
            let inputs = inputs
                .into_iter()
                .map(|(txid, vout)| TxIn::new(OutPoint::new(txid, vout)))
                .collect();
            let mut outputs: Vec<TxOut> = payments
                .into_iter()
                .map(|(amount, address)| TxOut {
                    amount,
                    script: Script::pay_to(address),
                })
                .collect();
            if let Some(op) = name_op {
                outputs[0].script.name_op = Some(op);
            }
            Transaction::new(inputs, outputs)
        })
}

#[cfg(test)]
mod tests {
    use super::*;

    proptest! {
        #[test]
        fn test_printable_ascii_valid_everywhere(bytes in printable_ascii(64)) {
            for encoding in Encoding::ALL {
                prop_assert!(encoding.is_valid(&bytes));
            }
        }

        #[test]
        fn test_non_ascii_rejected_by_ascii(bytes in non_ascii(32)) {
            prop_assert!(!Encoding::Ascii.is_valid(&bytes));
            prop_assert!(Encoding::Hex.is_valid(&bytes));
        }

        #[test]
        fn test_clean_utf8_is_valid(text in clean_utf8(32)) {
            prop_assert!(Encoding::Utf8.is_valid(text.as_bytes()));
        }

        #[test]
        fn test_transaction_structure(tx in transaction()) {
            prop_assert!(tx.check_structure().is_ok());
            prop_assert_eq!(Transaction::from_bytes(&tx.to_bytes()).unwrap(), tx);
        }
    }
}
