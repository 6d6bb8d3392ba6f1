// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Unit tests for the hickory resolver adapter.

#[cfg(test)]
mod tests {
    use std::net::Ipv4Addr;
    use std::str::FromStr;

    use hickory_client::rr::rdata::{A, SOA};
    use hickory_client::rr::{Name, RData, Record, RecordType as WireType};

    use crate::records::RecordType;
    use crate::resolver::hickory::*;

    #[test]
    fn test_wire_type_mapping_round_trips() {
        for record_type in RecordType::ALL {
            assert_eq!(
                from_wire_type(to_wire_type(record_type)),
                Some(record_type),
                "{record_type}"
            );
        }
    }

    #[test]
    fn test_spf_uses_type_code_99() {
        assert_eq!(to_wire_type(RecordType::SPF), WireType::Unknown(99));
    }

    #[test]
    fn test_unhandled_wire_types_are_ignored() {
        assert_eq!(from_wire_type(WireType::HINFO), None);
        assert_eq!(from_wire_type(WireType::CAA), None);
        assert_eq!(from_wire_type(WireType::Unknown(65_000)), None);
    }

    #[test]
    fn test_absolute_name() {
        assert_eq!(absolute_name("example.com"), "example.com.");
        assert_eq!(absolute_name("example.com."), "example.com.");
        assert_eq!(absolute_name(" www.example.com.. "), "www.example.com.");
    }

    #[test]
    fn test_is_timeout() {
        assert!(is_timeout("request timed out"));
        assert!(is_timeout("Timeout waiting for response"));
        assert!(!is_timeout("connection refused"));
    }

    fn soa() -> Record {
        Record::from_rdata(
            Name::from_str("example.com.").unwrap(),
            3600,
            RData::SOA(SOA::new(
                Name::from_str("ns1.example.com.").unwrap(),
                Name::from_str("admin.example.com.").unwrap(),
                2_024_010_101,
                3600,
                1800,
                604_800,
                86400,
            )),
        )
    }

    fn a(name: &str, last_octet: u8) -> Record {
        Record::from_rdata(
            Name::from_str(name).unwrap(),
            300,
            RData::A(A(Ipv4Addr::new(10, 0, 0, last_octet))),
        )
    }

    #[test]
    fn test_complete_transfer_drops_closing_soa() {
        let records = complete_transfer(vec![
            soa(),
            a("www.example.com.", 1),
            a("mail.example.com.", 2),
            soa(),
        ])
        .unwrap();

        let types: Vec<WireType> = records.iter().map(Record::record_type).collect();
        assert_eq!(types, vec![WireType::SOA, WireType::A, WireType::A]);
    }

    #[test]
    fn test_complete_transfer_requires_closing_soa() {
        let err = complete_transfer(vec![soa(), a("www.example.com.", 1)]).unwrap_err();
        assert!(err.contains("closing SOA"), "{err}");

        let err = complete_transfer(vec![soa()]).unwrap_err();
        assert!(err.contains("closing SOA"), "{err}");
    }

    #[test]
    fn test_complete_transfer_requires_opening_soa() {
        let err = complete_transfer(vec![a("www.example.com.", 1), soa()]).unwrap_err();
        assert!(err.contains("instead of SOA"), "{err}");

        assert!(complete_transfer(Vec::new()).is_err());
    }
}
