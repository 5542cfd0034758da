//! Match a purchase template against a few sentences
//!
//! Run with: RUST_LOG=debug cargo run --example buy

use proptree::{
    ConfusionScorer, EdgeMatcher, LogObserver, MatchConfig, MatchEngine, NodeMatcher,
    SymbolTable, parse_pattern, parse_target, smoothing::smooth_all,
};

fn main() {
    env_logger::init();

    let symbols = SymbolTable::new();
    let pattern = parse_pattern("buy(agent: ?buyer, object: ?thing^0.5)", &symbols)
        .expect("Failed to parse pattern");
    println!("Pattern: {}\n", pattern.display(&symbols));

    let sentences = [
        "buy@2(agent: John@0-1, object: car@4)",
        "say@1(agent: Mary@0, comp: purchase@4(agent: Sue@3, object: \"house\"@6))",
        "rain@1",
        "sell@1(agent: Bob@0, object: bike@3)",
    ];

    let scorer = ConfusionScorer::new()
        .with_predicate_confusion(symbols.intern("buy"), symbols.intern("purchase"), 0.9)
        .with_predicate_confusion(symbols.intern("buy"), symbols.intern("sell"), 0.2);
    let mut nodes = NodeMatcher::new(pattern.clone(), scorer.clone());
    let mut edges = EdgeMatcher::new(pattern.clone(), scorer.clone());
    let mut engine = MatchEngine::new(pattern, scorer, MatchConfig::default().with_threshold(0.1))
        .expect("Invalid config");

    let mut scores = Vec::new();
    for (sentno, text) in sentences.iter().enumerate() {
        let target = parse_target(text, &symbols).expect("Failed to parse sentence");
        engine
            .compute_coverage_with(&target, &mut LogObserver)
            .expect("Match error");

        println!("Sentence {}: {}", sentno, target.display(&symbols));
        for (idx, confidence, matched) in engine.coverage().iter() {
            match matched {
                Some(id) => println!(
                    "  pattern node {} -> {} ({:.2})",
                    idx,
                    symbols.resolve(target.node(id).predicate),
                    confidence
                ),
                None => println!("  pattern node {} unmatched", idx),
            }
        }
        if let Some(span) = target.covering_span(engine.coverage()) {
            println!("  tokens {}-{}", span.start, span.end);
        }

        let score = engine.coverage().weighted_score(engine.pattern());
        let node_score = nodes.compare_to_target(&target).expect("Match error");
        let edge_score = edges.compare_to_target(&target).expect("Match error");
        println!(
            "  full {:.3}, edge {:.3}, node {:.3}\n",
            score, edge_score, node_score
        );
        scores.push(score);
    }

    println!("Smoothed over a window of 3: {:?}", smooth_all(&scores, 3));
}
