use sf_ledger::{prices, Ledger, MICROS_SCALE};

const M: i64 = MICROS_SCALE;

#[test]
fn scenario_weighted_average_cost_across_buys_and_sells() {
    // GIVEN: $100,000 initial cash
    let mut ledger = Ledger::new(100_000 * M);

    // Buy 10 @ $100
    ledger.buy("AAPL", 10 * M, 100 * M, 0).unwrap();

    // Buy 10 @ $200 -> avg = (10×100 + 10×200) / 20 = $150
    ledger.buy("AAPL", 10 * M, 200 * M, 0).unwrap();

    let holding = ledger.holding("AAPL").expect("AAPL holding exists");
    assert_eq!(holding.qty_micros, 20 * M);
    assert_eq!(holding.avg_cost_micros, 150 * M);

    // Sell 5 @ $180: basis stays $150 on the remaining 15 shares
    let sale = ledger.sell("AAPL", 5 * M, 180 * M, 0).unwrap();
    assert_eq!(sale.avg_cost_at_sale_micros, Some(150 * M));
    // realized = (180 - 150) × 5 = $150
    assert_eq!(sale.realized_gain_micros, Some(150 * M));

    let holding = ledger.holding("AAPL").expect("AAPL holding exists");
    assert_eq!(holding.qty_micros, 15 * M);
    assert_eq!(holding.avg_cost_micros, 150 * M);

    // Buy 5 @ $300 -> avg = (15×150 + 5×300) / 20 = $187.50
    ledger.buy("AAPL", 5 * M, 300 * M, 0).unwrap();
    let holding = ledger.holding("AAPL").expect("AAPL holding exists");
    assert_eq!(holding.avg_cost_micros, 187_500_000);

    // Cash:
    // 100,000 - 1,000 - 2,000 + 900 - 1,500 = 96,400
    assert_eq!(ledger.cash_micros(), 96_400 * M);

    // Marked at $200: total = 96,400 + 20×200 = 100,400
    let px = prices([("AAPL", 200 * M)]);
    assert_eq!(ledger.total_value_micros(&px), 100_400 * M);

    assert!(ledger.verify_integrity());
}

#[test]
fn scenario_fractional_shares_stay_exact() {
    let mut ledger = Ledger::new(10_000 * M);

    // Buy 0.5 shares @ $100, then 1.5 shares @ $200
    ledger.buy("VT", M / 2, 100 * M, 0).unwrap();
    ledger.buy("VT", 3 * M / 2, 200 * M, 0).unwrap();

    let holding = ledger.holding("VT").expect("VT holding exists");
    assert_eq!(holding.qty_micros, 2 * M);
    // avg = (0.5×100 + 1.5×200) / 2 = $175
    assert_eq!(holding.avg_cost_micros, 175 * M);

    // cash = 10,000 - 50 - 300 = 9,650
    assert_eq!(ledger.cash_micros(), 9_650 * M);
}
