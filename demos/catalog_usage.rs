/// Catalogix API Demo
///
/// Demonstrates the major catalog operations:
/// - Registering field, keyword, facet and text indexes
/// - Indexing, reindexing and unindexing documents
/// - Textual and programmatic queries with sorting
/// - Facet counts and address mapping
/// - Transactions against a durable store

use catalogix::catalog::{CatalogQuery, DocumentMap, Metadata, QueryOptions};
use catalogix::index::keyword::Normalizer;
use catalogix::index::{Discriminator, FacetIndex};
use catalogix::query::Query;
use catalogix::{Catalog, Config, Document, Store, Value};

fn main() -> Result<(), Box<dyn std::error::Error>> {
    println!("\n╔═══════════════════════════════════════════════╗");
    println!("║        Catalogix - Catalog API Demo          ║");
    println!("╚═══════════════════════════════════════════════╝\n");

    // Step 1: Create catalog
    println!("Step 1: Registering indexes...");
    let config = Config {
        storage_dir: std::env::temp_dir().join("catalogix_demo"),
        ..Config::default()
    };
    let mut catalog = Catalog::with_config(config.clone())?;
    catalog.add_field_index("title", Discriminator::attribute("title")?)?;
    catalog.add_field_index("year", Discriminator::attribute("year")?)?;
    catalog.add_keyword_index("tags", Discriminator::attribute("tags")?, Normalizer::Lowercase)?;
    catalog.add_facet_index(
        "topics",
        Discriminator::attribute("topics")?,
        ["lang", "lang:rust", "lang:python", "ops"],
    )?;
    catalog.add_text_index("body", Discriminator::attribute("body")?)?;
    println!("  Indexes: {}\n", catalog.names().collect::<Vec<_>>().join(", "));

    // Step 2: Index documents inside a transaction
    println!("Step 2: Indexing documents...");
    let store = Store::from_config(&config)?;
    let mut documents = DocumentMap::new();
    {
        let mut tx = store.begin(&mut catalog);
        for (address, title, year, tags, topics, body) in [
            ("/books/ownership", "Ownership", 2018, vec!["Rust", "memory"], vec!["lang:rust"], "borrowing and lifetimes explained"),
            ("/books/async", "Async", 2021, vec!["rust", "io"], vec!["lang:rust"], "futures executors and async io"),
            ("/books/scripts", "Scripts", 2015, vec!["python"], vec!["lang:python"], "quick scripting for busy people"),
            ("/books/deploy", "Deploy", 2020, vec!["ops", "io"], vec!["ops"], "shipping services with containers"),
        ] {
            let docid = documents.add(address, None);
            let mut meta = Metadata::new();
            meta.insert("title".to_string(), Value::from(title));
            documents.add_metadata(docid, meta)?;
            let doc = Document::new()
                .with_field("title", title)
                .with_field("year", year)
                .with_field("tags", tags)
                .with_field("topics", topics)
                .with_field("body", body);
            tx.index_doc(docid, &doc)?;
        }
        tx.commit()?;
    }
    println!("  Indexed {} documents\n", documents.len());

    // Step 3: Query
    println!("Step 3: Querying...");
    let q = CatalogQuery::new(&catalog);
    let by_year = QueryOptions::new().sort_by("year");
    for text in [
        "tags == 'rust'",
        "tags in any(['io', 'memory']) and year >= 2019",
        "2015 < year <= 2020",
        "'async' in body or topics == 'ops'",
    ] {
        let (count, ids) = q.query(text, &by_year)?;
        let addresses: Vec<&str> = ids.iter().filter_map(|id| documents.address_for_docid(*id)).collect();
        println!("  {:<50} {} -> {:?}", text, count, addresses);
    }

    let tree = Query::ge("year", 2018) - Query::eq("tags", "ops");
    let (count, _) = q.query(&tree, &by_year.clone().reverse(true))?;
    println!("  {:<50} {}\n", tree.to_string(), count);

    // Step 4: Facets
    println!("Step 4: Facet counts...");
    let (_, ids) = q.query("year > 2016", &QueryOptions::new())?;
    let facets = catalog.get_as::<FacetIndex>("topics")?;
    let counts = facets.counts(&ids.into_iter().collect(), &[] as &[&str]);
    for (facet, count) in counts {
        println!("  {:<15} {}", facet, count);
    }

    // Step 5: Reload
    println!("\nStep 5: Reloading from {}...", config.storage_dir.display());
    let mut reloaded = Catalog::with_config(config.clone())?;
    for name in ["title", "year"] {
        reloaded.add_field_index(name, Discriminator::attribute(name)?)?;
    }
    reloaded.add_keyword_index("tags", Discriminator::attribute("tags")?, Normalizer::Lowercase)?;
    reloaded.add_facet_index("topics", Discriminator::attribute("topics")?, facets.taxonomy().clone())?;
    reloaded.add_text_index("body", Discriminator::attribute("body")?)?;
    store.load_into(&mut reloaded)?;
    let (count, _) = CatalogQuery::new(&reloaded).query("tags == 'rust'", &QueryOptions::new())?;
    println!("  'tags == rust' after reload: {} results", count);

    println!("\nDone!");
    Ok(())
}
