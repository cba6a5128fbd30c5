use paper_batch::priority::prioritize;
use std::path::PathBuf;

fn folders(names: &[&str]) -> Vec<(String, PathBuf)> {
    names
        .iter()
        .map(|n| (n.to_string(), PathBuf::from("in").join(n)))
        .collect()
}

fn names(input: &[&str]) -> Vec<String> {
    prioritize(folders(input)).into_iter().map(|f| f.name).collect()
}

#[test]
fn newest_first_undated_last() {
    assert_eq!(
        names(&["2020-01-01_A", "2022-06-01_B", "no_date_C"]),
        vec!["2022-06-01_B", "2020-01-01_A", "no_date_C"]
    );
}

#[test]
fn ties_keep_input_order() {
    let input = ["zeta", "2021-05-05_x", "alpha", "2021-05-05_a", "2099-99-99_bad"];
    assert_eq!(
        names(&input),
        vec!["2021-05-05_x", "2021-05-05_a", "zeta", "alpha", "2099-99-99_bad"]
    );
}

#[test]
fn repeated_runs_agree() {
    let input = ["b", "2019-01-01_q", "a", "2019-01-01_p", "2023-12-31_r"];
    let first = names(&input);
    for _ in 0..5 {
        assert_eq!(names(&input), first);
    }
}

#[test]
fn ranks_are_one_based() {
    let ranked = prioritize(folders(&["2001-01-01_a", "2002-01-01_b"]));
    assert_eq!(ranked[0].rank, 1);
    assert_eq!(ranked[0].name, "2002-01-01_b");
    assert_eq!(ranked[1].rank, 2);
}
