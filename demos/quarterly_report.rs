use icms_report::*;

fn ledger_row(date: &str, kind: EntryKind, tax: &str, gross: &str, state: &str, rate: &str) -> LedgerRow {
    LedgerRow {
        date: date.to_string(),
        kind,
        tax_amount: tax.to_string(),
        gross_amount: gross.to_string(),
        category: Some(state.to_string()),
        tax_rate: Some(rate.to_string()),
    }
}

fn cash_row(date: &str, inflow: &str, outflow: &str) -> CashRow {
    CashRow {
        date: date.to_string(),
        inflow: inflow.to_string(),
        outflow: outflow.to_string(),
    }
}

fn main() -> std::result::Result<(), Box<dyn std::error::Error>> {
    println!("📊 ICMS Apportionment & Cash Checkpoint Demo\n");

    let extract = SourceExtract {
        ledger_rows: vec![
            ledger_row("2025-01-06", EntryKind::Credit, "120.00", "1000.00", "SP", "0.12"),
            ledger_row("2025-01-15", EntryKind::Debit, "90.00", "500.00", "RJ", "0.18"),
            ledger_row("2025-02-10", EntryKind::Debit, "180.00", "1000.00", "SP", "0.18"),
            ledger_row("2025-03-03", EntryKind::Credit, "60.00", "500.00", "PR", "0.12"),
            ledger_row("2025-03-21", EntryKind::Debit, "24.00", "200.00", "RJ", "0.12"),
        ],
        cash_rows: vec![
            cash_row("2024-12-20", "1500", ""),
            cash_row("2025-01-10", "800", "200"),
            cash_row("2025-01-31", "", "450"),
            cash_row("2025-02-03", "1200", "1000"),
            cash_row("2025-02-27", "", "50"),
            cash_row("2025-03-12", "", "100"),
            cash_row("2025-03-28", "400", "300"),
        ],
        line_items: vec![LineItemRow {
            description: "Receita Líquida".to_string(),
            value: "3900".to_string(),
        }],
        contribution_rows: vec![
            ContributionRow {
                period: "2025-01".to_string(),
                credit: "1450.00".to_string(),
                debit: "1120.00".to_string(),
                balance: "330.00".to_string(),
            },
            ContributionRow {
                period: "2025-02".to_string(),
                credit: "980.00".to_string(),
                debit: "1210.00".to_string(),
                balance: "100.00".to_string(),
            },
        ],
    };

    let mut cache = ReportCache::new(ReportConfig::default());

    for period in ["2025-Q1", "2025-02"] {
        let selection = PeriodSelection::parse(period)?;
        let report = cache.get_or_compute(&extract, &selection)?;

        println!("=== {} ===", period);
        println!("{:<10} {:>10} {:>10} {:>10} {:>10}", "Month", "Credit", "Debit", "Carry in", "Due");
        for result in &report.apportionment {
            println!(
                "{:<10} {:>10.2} {:>10.2} {:>10.2} {:>10.2}",
                result.period, result.credit, result.debit, result.carry_in, result.due
            );
        }

        println!("\nCash checkpoints:");
        for checkpoint in &report.checkpoints {
            println!(
                "  {:?} {} -> {:.2}",
                checkpoint.label, checkpoint.date, checkpoint.balance
            );
        }

        let summary = &report.cash_summary;
        println!(
            "\nInflow {:.2} | Outflow {:.2} | Net {:.2} | Margin {:.2}%",
            summary.total_inflow, summary.total_outflow, summary.net, summary.margin_percent
        );

        let pis_cofins = &report.contributions;
        println!(
            "PIS/COFINS credits {:.2} | debits {:.2} | balance {:.2}",
            pis_cofins.total_credit, pis_cofins.total_debit, pis_cofins.final_balance
        );
        for point in &pis_cofins.month_end {
            println!("  {} -> {:.2}", point.period, point.balance);
        }

        for warning in &report.warnings {
            println!("⚠️  {}", warning);
        }
        println!();
    }

    if let Some(value) = cache
        .get_or_compute(&extract, &PeriodSelection::parse("2025-Q1")?)?
        .line_items
        .get("receita liquida")
    {
        println!("Receita líquida: {:.2}", value);
    }
    println!("Cache hits: {}, misses: {}", cache.hits(), cache.misses());

    Ok(())
}
