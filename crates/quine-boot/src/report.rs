//! Plain-text system report rendering.
//!
//! The report is a self-contained dump of the verified kernel: base64 glob,
//! hex dump, disassembly, and the session history log.

use crate::session::BootSession;
use quine_core::glob::decode_glob;
use quine_core::HistoryEntry;
use quine_genome::{opcode, parse_instructions, ModuleLayout};

pub fn render_report(session: &BootSession) -> String {
    let rule = "-".repeat(80);
    let image = decode_glob(session.stable_glob()).unwrap_or_default();

    let history = session
        .history()
        .iter()
        .map(render_history_line)
        .collect::<Vec<_>>()
        .join("\n");

    format!(
        "WASM QUINE BOOTLOADER - SYSTEM HISTORY EXPORT\n\
         Generated: {generated}\n\
         Final Generation: {generation}\n\
         Kernel Size: {size} bytes\n\
         System Era: {era}\n\
         \n\
         CURRENT KERNEL (BASE64):\n\
         {rule}\n\
         {glob}\n\
         {rule}\n\
         \n\
         HEX DUMP:\n\
         {rule}\n\
         {hex}\n\
         {rule}\n\
         \n\
         DISASSEMBLY:\n\
         {rule}\n\
         IDX | ADDR   | OPCODE       ARGS\n\
         {rule}\n\
         {disassembly}\n\
         {rule}\n\
         \n\
         HISTORY LOG:\n\
         {rule}\n\
         {history}\n\
         {rule}\n\
         END OF REPORT\n",
        generated = chrono::Utc::now().to_rfc3339_opts(chrono::SecondsFormat::Millis, true),
        generation = session.generation(),
        size = image.len(),
        era = session.era(),
        rule = rule,
        glob = session.stable_glob(),
        hex = render_hex_dump(&image),
        disassembly = render_disassembly(&image),
        history = history,
    )
}

/// Sixteen bytes per row with an ASCII gutter.
fn render_hex_dump(bytes: &[u8]) -> String {
    bytes
        .chunks(16)
        .enumerate()
        .map(|(row, chunk)| {
            let hex = chunk
                .iter()
                .map(|b| format!("{:02X}", b))
                .collect::<Vec<_>>()
                .join(" ");
            let ascii: String = chunk
                .iter()
                .map(|&b| if (32..=126).contains(&b) { b as char } else { '.' })
                .collect();
            format!("0x{:04X}  {:<48}  |{}|", row * 16, hex, ascii)
        })
        .collect::<Vec<_>>()
        .join("\n")
}

fn render_disassembly(image: &[u8]) -> String {
    let layout = match ModuleLayout::locate(image) {
        Ok(layout) => layout,
        Err(_) => return "No instructions available.".to_string(),
    };
    let instructions = parse_instructions(layout.instruction_stream(image));
    if instructions.is_empty() {
        return "No instructions available.".to_string();
    }

    instructions
        .iter()
        .enumerate()
        .map(|(idx, inst)| {
            let args = inst
                .operand
                .iter()
                .map(|b| format!("0x{:X}", b))
                .collect::<Vec<_>>()
                .join(" ");
            format!(
                "{:03} | 0x{:04X} | {:<12} {}",
                idx,
                inst.source_offset,
                opcode::name(inst.opcode),
                args
            )
        })
        .collect::<Vec<_>>()
        .join("\n")
}

fn render_history_line(entry: &HistoryEntry) -> String {
    format!(
        "[GEN {:04}] {} | {:<10} | {} | {}",
        entry.generation,
        entry.timestamp.format("%H:%M:%S%.3f"),
        entry.action,
        if entry.success { "OK" } else { "FAIL" },
        entry.details,
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::snapshot::SessionSnapshot;
    use quine_core::glob::encode_glob;
    use quine_core::{BootConfig, Corpus, RuntimeLimits};

    fn seed_session() -> BootSession {
        BootSession::new(BootConfig::default(), RuntimeLimits::default()).unwrap()
    }

    #[test]
    fn test_report_covers_every_section() {
        let session = seed_session();
        let report = render_report(&session);

        assert!(report.starts_with("WASM QUINE BOOTLOADER - SYSTEM HISTORY EXPORT\n"));
        assert!(report.ends_with("END OF REPORT\n"));
        assert!(report.contains("Final Generation: 0"));
        assert!(report.contains("Kernel Size: 91 bytes"));
        assert!(report.contains("System Era: PRIMORDIAL"));
        assert!(report.contains("CURRENT KERNEL (BASE64):"));
        assert!(report.contains(session.stable_glob()));
        assert!(report.contains("HEX DUMP:"));
        assert!(report.contains("DISASSEMBLY:"));
        assert!(report.contains("IDX | ADDR   | OPCODE       ARGS"));
        assert!(report.contains("HISTORY LOG:"));
    }

    #[test]
    fn test_hex_dump_rows() {
        let session = seed_session();
        let report = render_report(&session);

        // Module preamble, sixteen bytes wide, with the ASCII gutter.
        assert!(report.contains("0x0000  00 61 73 6D 01 00 00 00"));
        assert!(report.contains("|.asm"));
        // 91 bytes span six rows.
        assert!(report.contains("0x0050"));
        assert!(!report.contains("0x0060"));
    }

    #[test]
    fn test_disassembly_rows_for_seed_kernel() {
        let session = seed_session();
        let report = render_report(&session);

        assert!(report.contains("000 | 0x0000 | local.get    0x0"));
        assert!(report.contains("001 | 0x0002 | local.get    0x1"));
        assert!(report.contains("002 | 0x0004 | call         0x0"));
        assert!(report.contains("003 | 0x0006 | nop"));
    }

    #[test]
    fn test_disassembly_falls_back_without_code_section() {
        let snapshot = SessionSnapshot {
            version: 1,
            timestamp: 0,
            stable_glob: encode_glob(&[0x00, 0x61, 0x73, 0x6D]),
            generation: 3,
            retry_count: 0,
            attempt: 3,
            corpus: Corpus::new(),
            history: Vec::new(),
        };
        let session =
            BootSession::from_snapshot(BootConfig::default(), RuntimeLimits::default(), snapshot)
                .unwrap();

        let report = render_report(&session);
        assert!(report.contains("No instructions available."));
        assert!(report.contains("Kernel Size: 4 bytes"));
    }

    #[test]
    fn test_history_line_format() {
        let entry = HistoryEntry::new(7, 94, "EXECUTE", "Verification Success", true);
        let line = render_history_line(&entry);

        assert!(line.starts_with("[GEN 0007] "));
        assert!(line.contains(" | EXECUTE    | OK | Verification Success"));

        let failed = HistoryEntry::new(12, 91, "REPAIR", "Boot failure", false);
        assert!(render_history_line(&failed).contains(" | REPAIR     | FAIL | Boot failure"));
    }
}
