use proptest::prelude::*;

use fundme_script::{decode_number, encode_number, Address, AddressType, Network, Script};

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    #[test]
    fn script_number_encode_decode_roundtrip(val in any::<i64>()) {
        let bytes = encode_number(val);
        prop_assert!(bytes.len() <= 9);
        let decoded = decode_number(&bytes, 9).expect("minimal encoding decodes");
        prop_assert_eq!(decoded, val);
    }

    /// Every push appended by the builder reads back as the last push.
    #[test]
    fn append_push_data_reads_back(data in prop::collection::vec(any::<u8>(), 0..600)) {
        let mut script = Script::new();
        script.append_opcodes(&[fundme_script::opcodes::OP_DROP]).expect("opcode");
        script.append_push_data(&data).expect("push");
        let last = script.last_push().expect("ends in a push");
        prop_assert_eq!(last, data);
    }

    #[test]
    fn cashaddr_roundtrip(
        hash in prop::collection::vec(any::<u8>(), 20),
        hash32 in prop::collection::vec(any::<u8>(), 32),
        token_aware in any::<bool>(),
        network in prop::sample::select(vec![Network::Mainnet, Network::Chipnet, Network::Regtest]),
    ) {
        for (kind, hash) in [
            (AddressType::P2pkh, hash.clone()),
            (AddressType::P2sh20, hash),
            (AddressType::P2sh32, hash32),
        ] {
            let addr = Address { network, kind, token_aware, hash };
            let parsed = Address::from_string(&addr.to_string()).expect("own encoding parses");
            prop_assert_eq!(parsed, addr);
        }
    }
}
