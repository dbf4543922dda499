//! Query builder throughput: filter validation plus SQL assembly
//! for a large multi-symbol, multi-strain search.
//!
//! Usage: cargo bench -p snpwizard-core --bench query_builder

use snpwizard_core::filter::{FilterParams, SearchFilter};
use snpwizard_core::query::{Projection, QueryBuilder};
use snpwizard_core::reference::{ConsequenceVocabulary, ReferenceData, StrainRegistry};
use std::time::Instant;

const ITERATIONS: usize = 20_000;

fn reference(strains: &[String]) -> ReferenceData {
    ReferenceData {
        consequences: ConsequenceVocabulary::new(
            (0..40).map(|i| format!("consequence_{}", i)).collect(),
            vec![],
        ),
        strains: StrainRegistry::new(strains.to_vec(), vec![]).expect("valid strain names"),
        tables: Default::default(),
    }
}

fn main() {
    let strains: Vec<String> = (0..36).map(|i| format!("STRAIN_{:02}", i)).collect();
    let reference = reference(&strains);

    let symbols: Vec<String> = (0..200).map(|i| format!("Gene{}", i)).collect();
    let mut params = FilterParams::new();
    params.set("table", "grcm39_snps");
    params.set("searchBy", "symbols");
    params.set("symbols", symbols.join(","));
    params.set("consequences", "0,1,2,3,4,5,6,7,8,9");
    params.set("strains", strains.join(","));
    params.set("highConfidence", "true");
    params.set("limit", "10000");
    params.set("offset", "20000");

    let builder = QueryBuilder::new(&reference.strains);
    let projection = Projection::for_strains(&strains);

    let start = Instant::now();
    let mut total_len = 0usize;
    for _ in 0..ITERATIONS {
        let filter = SearchFilter::from_params(&params, &reference).expect("valid filter");
        let query = builder
            .build(&filter, &projection, true)
            .expect("query builds");
        total_len += query.text.len();
    }
    let elapsed = start.elapsed();

    println!("=== Query builder: 200 symbols × 36 strains ===");
    println!("Iterations:    {}", ITERATIONS);
    println!("Total time:    {:.3}s", elapsed.as_secs_f64());
    println!(
        "Per build:     {:.2}µs",
        elapsed.as_secs_f64() * 1e6 / ITERATIONS as f64
    );
    println!("Avg SQL bytes: {}", total_len / ITERATIONS);
}
