use std::fmt::Write as _;

use rand::{Rng, SeedableRng, rngs::StdRng};

const BASE: &str = "<r-require name=\"user\" type=\"&User\"/>
<html>
<head><title><r-slot name=\"title\">Untitled</r-slot></title></head>
<body>
<nav><a href=\"/\" class=\"home\"><r-set name=\"class\" value=\"theme\" append r-if=\"user.dark\"/>Home</a></nav>
<r-slot/>
</body>
</html>
";

/// Generate a layout plus `n` random pages that extend it and include each
/// other, as `(page name, source)` pairs.
pub fn generate_random_pages(n: usize) -> Vec<(String, String)> {
    let mut rng = StdRng::seed_from_u64(42); // Fixed seed for reproducibility
    let mut pages: Vec<(String, String)> = Vec::with_capacity(n + 1);
    pages.push(("layouts/base".to_string(), BASE.to_string()));

    for i in 0..n {
        let name = format!("pages/{}_{i}", random_string(&mut rng, 3, 8));
        let mut body = String::from(
            "<r-require name=\"user\" type=\"&User\"/>\n<r-extend name=\"layouts/base\"/>\n",
        );

        let sections = rng.random_range(3..10);
        for _ in 0..sections {
            match rng.random_range(0..4) {
                0 => {
                    let title = random_string(&mut rng, 5, 12);
                    writeln!(body, "<h1 r-add-to-slot=\"title\">{title}</h1>").unwrap();
                }
                1 => {
                    body.push_str("<ul>\n");
                    body.push_str("  <li r-for-every=\"&user.items\"><r-value of=\"item.name\"/></li>\n");
                    body.push_str("  <li r-else>none</li>\n");
                    body.push_str("</ul>\n");
                }
                2 => {
                    let yes = random_string(&mut rng, 3, 10);
                    let no = random_string(&mut rng, 3, 10);
                    writeln!(
                        body,
                        "<p r-if=\"user.active\">{yes}</p>\n<p r-else>{no}</p>"
                    )
                    .unwrap();
                }
                _ if i > 0 => {
                    // Only earlier pages, so includes never form a cycle.
                    let target = rng.random_range(1..=i);
                    let (included, _) = &pages[target];
                    writeln!(body, "<r-include name=\"{included}\"/>").unwrap();
                }
                _ => body.push_str("<hr>\n"),
            }
        }
        pages.push((name, body));
    }

    pages
}

/// Generate a random string with length between min and max
fn random_string(rng: &mut StdRng, min_len: usize, max_len: usize) -> String {
    let charset = "abcdefghijklmnopqrstuvwxyz";
    let len = rng.random_range(min_len..=max_len);

    (0..len)
        .map(|_| {
            let idx = rng.random_range(0..charset.len());
            charset.chars().nth(idx).unwrap()
        })
        .collect()
}

// Print binary size information - can be used from individual benchmarks
pub fn print_binary_size() {
    let binary_path = std::env::current_exe().unwrap();
    let metadata = std::fs::metadata(binary_path.clone()).unwrap();
    let size_bytes = metadata.len();
    let size_kb = size_bytes as f64 / 1024.0;
    let size_mb = size_kb / 1024.0;

    println!(
        "Binary size: {:.2} MB ({:.2} KB, {} bytes)",
        size_mb, size_kb, size_bytes
    );
    println!("Binary path: {}", binary_path.display());
}
