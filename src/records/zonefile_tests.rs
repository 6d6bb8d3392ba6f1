// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Unit tests for the zone-file line model.

#[cfg(test)]
mod tests {
    use crate::records::normalize::format_line;
    use crate::records::zonefile::*;
    use crate::records::RecordType;

    const ZONE: &str = "example.com";

    fn sample_zone() -> String {
        [
            "$TTL 3600",
            "@   IN  SOA ns1.example.com. admin.example.com. (",
            "        2024010101 ; serial",
            "        3600       ; refresh",
            "        1800       ; retry",
            "        604800     ; expire",
            "        86400 )    ; minimum",
            "@   IN  NS  ns1.example.com.",
            "www  3600  IN  A  10.0.0.1",
            "",
            "; end",
            "",
        ]
        .join("\n")
    }

    fn matcher<'a>(name: &'a str, record_type: RecordType, value: &'a str) -> RecordMatcher<'a> {
        RecordMatcher {
            zone: ZONE,
            name,
            record_type,
            value,
        }
    }

    #[test]
    fn test_parse_classifies_lines() {
        let file = ZoneFile::parse(&sample_zone());
        let lines = file.lines();

        assert!(matches!(lines[0], ZoneLine::Directive(_)));
        assert!(matches!(lines[1], ZoneLine::Record { parsed: Some(_), .. }));
        // SOA body, including its comment-only tails, is continuation
        for line in &lines[2..7] {
            assert!(matches!(line, ZoneLine::Record { parsed: None, .. }));
        }
        assert!(matches!(lines[8], ZoneLine::Record { parsed: Some(_), .. }));
        assert!(matches!(lines[9], ZoneLine::Blank(_)));
        assert!(matches!(lines[10], ZoneLine::Comment(_)));
    }

    #[test]
    fn test_render_is_lossless() {
        let content = sample_zone();
        assert_eq!(ZoneFile::parse(&content).render(), content);

        let odd = "  \t\n;c\n$ORIGIN example.com.\nwww IN A 1.2.3.4 ; trailing\n\tIN AAAA ::1";
        assert_eq!(ZoneFile::parse(odd).render(), odd);
    }

    #[test]
    fn test_records_strip_trailing_comments() {
        let file = ZoneFile::parse("www IN A 1.2.3.4 ; web\n");
        let records: Vec<_> = file.records().collect();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].value, "1.2.3.4");
    }

    #[test]
    fn test_indented_record_inherits_owner() {
        let file = ZoneFile::parse("mail IN A 10.0.0.2\n    IN AAAA 2001:db8::2");
        let records: Vec<_> = file.records().collect();
        assert_eq!(records[1].name, "mail");
        assert_eq!(records[1].record_type, "AAAA");
    }

    #[test]
    fn test_delete_scenario_removes_only_the_record_line() {
        let mut file = ZoneFile::parse("www  3600  IN  A  10.0.0.1\n\n; end");
        let outcome = file.remove_first(&matcher("www", RecordType::A, "10.0.0.1"));

        assert_eq!(outcome, MatchOutcome { found: true, checked: 1 });
        assert_eq!(file.render(), "\n; end");
    }

    #[test]
    fn test_delete_and_bump_serial() {
        let mut file = ZoneFile::parse(&sample_zone());
        let outcome = file.remove_first(&matcher("www.example.com.", RecordType::A, "10.0.0.1"));
        assert!(outcome.found);
        assert_eq!(file.bump_serial(), Some((2_024_010_101, 2_024_010_102)));

        let rendered = file.render();
        assert!(rendered.contains("        2024010102 ; serial"));
        assert!(!rendered.contains("10.0.0.1"));
        assert!(rendered.ends_with("@   IN  NS  ns1.example.com.\n\n; end\n"));
    }

    #[test]
    fn test_delete_twice_reports_not_found() {
        let mut file = ZoneFile::parse(&sample_zone());
        let target = matcher("www", RecordType::A, "10.0.0.1");
        assert!(file.remove_first(&target).found);

        let second = file.remove_first(&target);
        assert!(!second.found);
        assert_eq!(second.checked, 0);
    }

    #[test]
    fn test_remove_only_first_match() {
        let mut file = ZoneFile::parse("www IN A 10.0.0.1\nwww IN A 10.0.0.1\n");
        let outcome = file.remove_first(&matcher("www", RecordType::A, "10.0.0.1"));
        assert_eq!(outcome.checked, 2);
        assert_eq!(file.render(), "www IN A 10.0.0.1\n");
    }

    #[test]
    fn test_remove_moves_owner_to_inheriting_line() {
        let mut file = ZoneFile::parse("mail IN A 10.0.0.2\n    IN AAAA 2001:db8::2\n");
        assert!(file.remove_first(&matcher("mail", RecordType::A, "10.0.0.2")).found);
        assert_eq!(file.render(), "mail    IN AAAA 2001:db8::2\n");
        assert_eq!(file.records().next().map(|r| r.name.as_str()), Some("mail"));
    }

    #[test]
    fn test_match_requires_type_name_and_value() {
        let mut file = ZoneFile::parse(&sample_zone());
        assert!(!file.remove_first(&matcher("www", RecordType::AAAA, "10.0.0.1")).found);
        assert!(!file.remove_first(&matcher("ftp", RecordType::A, "10.0.0.1")).found);
        assert!(!file.remove_first(&matcher("www", RecordType::A, "10.0.0.2")).found);
        assert_eq!(file.render(), sample_zone());
    }

    #[test]
    fn test_mx_match_ignores_preference() {
        let mut file = ZoneFile::parse("@ IN MX 10 mail.example.com.\n");
        let outcome = file.remove_first(&matcher("@", RecordType::MX, "20 mail.example.com"));
        assert!(outcome.found);
    }

    #[test]
    fn test_replace_first() {
        let mut file = ZoneFile::parse(&sample_zone());
        let new_line = format_line("www", RecordType::A, "10.0.0.9", 600);
        let outcome = file.replace_first(&matcher("www", RecordType::A, "10.0.0.1"), new_line.clone());

        assert!(outcome.found);
        assert!(file.render().contains(&new_line));
        assert!(!file.render().contains("10.0.0.1"));
    }

    fn owners(file: &ZoneFile) -> Vec<String> {
        ZoneFile::parse(&file.render())
            .records()
            .map(|r| format!("{} {}", r.name, r.record_type))
            .collect()
    }

    #[test]
    fn test_replace_with_new_owner_keeps_inheriting_records() {
        let mut file = ZoneFile::parse("www IN A 10.0.0.1\n    IN AAAA 2001:db8::1\n");
        let new_line = format_line("api", RecordType::A, "10.0.0.1", 3600);
        assert!(file
            .replace_first(&matcher("www", RecordType::A, "10.0.0.1"), new_line.clone())
            .found);

        assert_eq!(file.render(), format!("{new_line}\nwww    IN AAAA 2001:db8::1\n"));
        assert_eq!(owners(&file), vec!["api A", "www AAAA"]);
    }

    #[test]
    fn test_replace_same_owner_leaves_inheriting_records_alone() {
        let content = "www IN A 10.0.0.1\n    IN AAAA 2001:db8::1\n";
        let mut file = ZoneFile::parse(content);
        let new_line = format_line("www", RecordType::A, "10.0.0.9", 3600);
        assert!(file
            .replace_first(&matcher("www", RecordType::A, "10.0.0.1"), new_line.clone())
            .found);

        assert_eq!(file.render(), format!("{new_line}\n    IN AAAA 2001:db8::1\n"));
        assert_eq!(owners(&file), vec!["www A", "www AAAA"]);
    }

    #[test]
    fn test_replace_indented_record_keeps_following_owner() {
        let mut file = ZoneFile::parse(
            "www IN A 10.0.0.1\n    IN AAAA 2001:db8::1\n    IN TXT \"web\"\n",
        );
        let new_line = format_line("api", RecordType::AAAA, "2001:db8::1", 3600);
        assert!(file
            .replace_first(&matcher("www", RecordType::AAAA, "2001:db8::1"), new_line)
            .found);

        assert_eq!(owners(&file), vec!["www A", "api AAAA", "www TXT"]);
    }

    #[test]
    fn test_insert_keeps_owner_of_indented_records_after_blank() {
        let mut file = ZoneFile::parse("www IN A 10.0.0.1\n\n    IN AAAA 2001:db8::1\n");
        let new_line = format_line("api", RecordType::A, "10.0.0.20", 3600);
        file.insert_record(new_line.clone());

        assert_eq!(
            file.render(),
            format!("www IN A 10.0.0.1\n{new_line}\n\nwww    IN AAAA 2001:db8::1\n")
        );
        assert_eq!(owners(&file), vec!["www A", "api A", "www AAAA"]);
    }

    #[test]
    fn test_remove_keeps_owner_across_blank_lines() {
        let mut file = ZoneFile::parse("@ IN NS ns1.\nmail IN A 10.0.0.2\n\n    IN AAAA 2001:db8::2\n");
        assert!(file.remove_first(&matcher("mail", RecordType::A, "10.0.0.2")).found);
        assert_eq!(owners(&file), vec!["@ NS", "mail AAAA"]);
    }

    #[test]
    fn test_insert_before_first_blank_after_records() {
        let mut file = ZoneFile::parse(&sample_zone());
        let new_line = format_line("ftp", RecordType::A, "10.0.0.3", 3600);
        file.insert_record(new_line.clone());

        let rendered = file.render();
        let expected = format!("www  3600  IN  A  10.0.0.1\n{new_line}\n\n; end\n");
        assert!(rendered.ends_with(&expected), "{rendered}");
    }

    #[test]
    fn test_insert_skips_leading_comments() {
        let mut file = ZoneFile::parse("; header\n\n@ IN NS ns1.\nwww IN A 1.2.3.4\n; tail");
        file.insert_record("new IN A 5.6.7.8".to_string());
        assert_eq!(
            file.render(),
            "; header\n\n@ IN NS ns1.\nwww IN A 1.2.3.4\nnew IN A 5.6.7.8\n; tail"
        );
    }

    #[test]
    fn test_insert_appends_before_trailing_newline() {
        let mut file = ZoneFile::parse("@ IN NS ns1.\nwww IN A 1.2.3.4\n");
        // The trailing empty element is the first blank after the records
        file.insert_record("new IN A 5.6.7.8".to_string());
        assert_eq!(
            file.render(),
            "@ IN NS ns1.\nwww IN A 1.2.3.4\nnew IN A 5.6.7.8\n"
        );

        let mut file = ZoneFile::parse("$TTL 60");
        file.insert_record("new IN A 5.6.7.8".to_string());
        assert_eq!(file.render(), "$TTL 60\nnew IN A 5.6.7.8");
    }

    #[test]
    fn test_insert_never_lands_inside_soa_parentheses() {
        let content = "@ IN SOA ns1. admin. (\n\n  1 ; serial\n  60 60 60 60 )\nwww IN A 1.2.3.4";
        let mut file = ZoneFile::parse(content);
        file.insert_record("new IN A 5.6.7.8".to_string());
        assert_eq!(file.render(), format!("{content}\nnew IN A 5.6.7.8"));
    }

    #[test]
    fn test_bump_serial_single_line_soa() {
        let mut file = ZoneFile::parse(
            "@ 3600 IN SOA ns1.example.com. admin.example.com. 7 3600 1800 604800 86400\n",
        );
        assert_eq!(file.bump_serial(), Some((7, 8)));
        assert_eq!(
            file.render(),
            "@ 3600 IN SOA ns1.example.com. admin.example.com. 8 3600 1800 604800 86400\n"
        );
    }

    #[test]
    fn test_bump_serial_with_open_paren_on_serial_line() {
        let mut file = ZoneFile::parse("@ IN SOA ns1. admin. (42\n 1 2 3 4)");
        assert_eq!(file.bump_serial(), Some((42, 43)));
        assert_eq!(file.render(), "@ IN SOA ns1. admin. (43\n 1 2 3 4)");
    }

    #[test]
    fn test_bump_serial_ignores_soa_in_comments() {
        let mut file = ZoneFile::parse("; SOA 1 2 3\n@ IN SOA ns1. admin. 99 1 2 3 4");
        assert_eq!(file.bump_serial(), Some((99, 100)));
        assert!(file.render().starts_with("; SOA 1 2 3\n"));
    }

    #[test]
    fn test_bump_serial_wraps() {
        let mut file = ZoneFile::parse("@ IN SOA ns1. admin. 4294967295 1 2 3 4");
        assert_eq!(file.bump_serial(), Some((u32::MAX, 0)));
        assert_eq!(file.render(), "@ IN SOA ns1. admin. 0 1 2 3 4");
    }

    #[test]
    fn test_bump_serial_without_soa_leaves_file_unchanged() {
        let content = "www IN A 1.2.3.4\n";
        let mut file = ZoneFile::parse(content);
        assert_eq!(file.bump_serial(), None);
        assert_eq!(file.render(), content);

        let content = "@ IN SOA ns1. admin. notanumber 1 2 3 4";
        let mut file = ZoneFile::parse(content);
        assert_eq!(file.bump_serial(), None);
        assert_eq!(file.render(), content);
    }
}
