use log::{debug, info, warn};

use copeland_ranking::diff::diff;
use copeland_ranking::*;
use snafu::{prelude::*, Snafu};

use std::collections::{BTreeMap, HashSet};
use std::fs;

use serde_json::json;
use serde_json::Value as JSValue;
use text_diff::print_diff;

use crate::tally::manifest_reader::*;

mod manifest_reader;

#[derive(Debug, Snafu)]
pub enum AppError {
    #[snafu(display("Error opening file {path}"))]
    OpeningJson {
        source: std::io::Error,
        path: String,
    },
    #[snafu(display("Error parsing the JSON content of {path}"))]
    ParsingJson {
        source: serde_json::Error,
        path: String,
    },
    #[snafu(display("Error serializing the summary"))]
    SerializingJson { source: serde_json::Error },
    #[snafu(display("Error writing the summary to {path}"))]
    WritingSummary {
        source: std::io::Error,
        path: String,
    },
    #[snafu(display("Tally error: {source}"))]
    Tally { source: TallyError },

    #[snafu(whatever, display("{message}"))]
    Whatever {
        message: String,
        #[snafu(source(from(Box<dyn std::error::Error>, Some)))]
        source: Option<Box<dyn std::error::Error>>,
    },
}

type AppResult<T> = Result<T, AppError>;

fn validate_scoring(scoring: &ManifestScoring) -> AppResult<ScoringOptions> {
    let res = ScoringOptions {
        algorithm: match scoring.algorithm.as_str() {
            "copeland" => Algorithm::Copeland,
            "copeland:ens-spp2025a" | "variant:ens-spp2025a" => Algorithm::GroupDeduplicated,
            "copeland:ens-spp2" => Algorithm::PrecedenceAdjusted,
            x => {
                whatever!("Cannot use algorithm {:?}: currently not implemented", x)
            }
        },
        points: match scoring.copeland_points.as_deref() {
            None => CopelandPoints::STANDARD,
            Some([win, tie, loss]) => CopelandPoints::from_weights([*win, *tie, *loss]),
            Some(x) => {
                whatever!(
                    "copelandPoints must hold the points for a win, a tie and a loss, got {:?}",
                    x
                )
            }
        },
        tiebreaker: match scoring.tiebreaker.as_deref() {
            None | Some("total-support") => Tiebreaker::TotalSupport,
            Some("average-support") => Tiebreaker::AverageSupport,
            Some(x) => {
                whatever!("Cannot use tiebreaker {:?}", x)
            }
        },
        unranked_from: scoring.unranked_from.clone().filter(|s| !s.is_empty()),
        group_by: scoring.group_by.clone().filter(|s| !s.is_empty()),
    };
    Ok(res)
}

fn validate_entries(entries: &[ManifestEntry]) -> AppResult<Vec<Choice>> {
    if entries.is_empty() {
        whatever!("The manifest does not list any entry");
    }
    let mut seen: HashSet<&str> = HashSet::new();
    for e in entries {
        if !seen.insert(e.choice.as_str()) {
            whatever!("Entry {:?} is listed more than once", e.choice);
        }
    }
    Ok(entries.iter().map(|e| e.to_choice()).collect())
}

fn create_ballots(dump: &VoteDump) -> AppResult<Vec<Ballot>> {
    let mut res: Vec<Ballot> = Vec::with_capacity(dump.votes.len());
    for v in dump.votes.iter() {
        res.push(Ballot::weighted(&v.voter, v.vp, &v.choice).context(TallySnafu {})?);
    }
    Ok(res)
}

fn tally_dump(
    definitions: &[Choice],
    options: &ScoringOptions,
    dump: &VoteDump,
) -> AppResult<(KeyedChoices, Vec<ScoredResult>)> {
    let choices = key_choices(definitions, &dump.choices).context(TallySnafu {})?;
    let ballots = create_ballots(dump)?;
    let ranked = run_tally(&choices, &ballots, options).context(TallySnafu {})?;
    Ok((choices, ranked))
}

fn choice_js(choices: &KeyedChoices, key: ChoiceKey) -> (String, String) {
    match choices.get(key) {
        Some(c) => (
            c.label.clone(),
            c.title.clone().unwrap_or_else(|| c.label.clone()),
        ),
        None => (String::new(), String::new()),
    }
}

fn average_support_str(r: &ScoredResult) -> String {
    if r.appearances == 0 {
        VotingPower::EMPTY.to_string()
    } else {
        VotingPower::from_units(r.total_support.units() / r.appearances as u128).to_string()
    }
}

fn results_to_json(choices: &KeyedChoices, ranked: &[ScoredResult]) -> Vec<JSValue> {
    ranked
        .iter()
        .enumerate()
        .map(|(idx, r)| {
            let (choice, label) = choice_js(choices, r.key);
            json!({
                "rank": idx + 1,
                "key": r.key.0,
                "choice": choice,
                "label": label,
                "wins": r.wins,
                "ties": r.ties,
                "losses": r.losses,
                "points": r.points,
                "totalSupport": r.total_support.to_string(),
                "appearances": r.appearances,
                "averageSupport": average_support_str(r),
            })
        })
        .collect()
}

fn diff_to_json(choices: &KeyedChoices, records: &BTreeMap<ChoiceKey, DiffRecord>) -> Vec<JSValue> {
    records
        .values()
        .map(|d| {
            let (choice, _) = choice_js(choices, d.key);
            json!({
                "key": d.key.0,
                "choice": choice,
                "rank": d.rank,
                "wins": d.wins,
                "ties": d.ties,
                "losses": d.losses,
                "points": d.points,
                "totalSupport": d.total_support,
                "appearances": d.appearances,
                "averageSupport": d.average_support,
            })
        })
        .collect()
}

fn allocation_to_json(choices: &KeyedChoices, allocated: &[AllocatedResult]) -> Vec<JSValue> {
    allocated
        .iter()
        .map(|a| {
            let (choice, _) = choice_js(choices, a.result.key);
            let stream = match a.stream() {
                FundingStream::LongStream => "two-year",
                FundingStream::ShortStream => "one-year",
                FundingStream::Unfunded => "none",
            };
            json!({
                "key": a.result.key.0,
                "choice": choice,
                "funding1Year": a.funding_1_year,
                "funding2Year": a.funding_2_year,
                "isFunded": a.is_funded(),
                "stream": stream,
            })
        })
        .collect()
}

fn build_summary_js(manifest: &Manifest, options: &ScoringOptions) -> JSValue {
    json!({
        "version": manifest.version,
        "algorithm": manifest.scoring.algorithm,
        "copelandPoints": [options.points.win, options.points.tie, options.points.loss],
        "tiebreaker": match options.tiebreaker {
            Tiebreaker::AverageSupport => "average-support",
            Tiebreaker::TotalSupport => "total-support",
        },
        "unrankedFrom": options.unranked_from,
        "groupBy": options.group_by,
    })
}

fn write_summary(pretty_js: &str, out: &Option<String>) -> AppResult<()> {
    match out.as_deref() {
        None | Some("stdout") => {
            println!("{}", pretty_js);
        }
        Some("") => {}
        Some(path) => {
            info!("Writing summary to {}", path);
            fs::write(path, pretty_js).context(WritingSummarySnafu { path })?;
        }
    }
    Ok(())
}

/// Tallies one proposal and writes its summary.
///
/// Arguments:
/// * `manifest_path` the manifest of the proposal
/// * `votes_path` the exported votes
/// * `baseline_path` if provided, another export of votes to compare against
/// * `budgets` if provided, the ranked choices are also funded
/// * `out` where to write the summary (`stdout` by default)
/// * `check_summary_path` if provided, the summary must match this reference
pub fn run_proposal(
    manifest_path: String,
    votes_path: String,
    baseline_path: Option<String>,
    budgets: Option<AllocationBudgets>,
    out: Option<String>,
    check_summary_path: Option<String>,
) -> AppResult<()> {
    let manifest = read_manifest(&manifest_path)?;
    info!("manifest: {:?}", manifest);

    // Validate the manifest:
    let options = validate_scoring(&manifest.scoring)?;
    let definitions = validate_entries(&manifest.entries)?;

    let dump = read_votes(&votes_path)?;
    let (choices, ranked) = tally_dump(&definitions, &options, &dump)?;
    info!("ranked: {:?}", ranked);

    let mut summary = json!({
        "config": build_summary_js(&manifest, &options),
        "results": results_to_json(&choices, &ranked),
    });

    if let Some(p) = baseline_path {
        let baseline = read_votes(&p)?;
        if baseline.choices != dump.choices {
            whatever!(
                "The baseline {} does not number the choices like {}",
                p,
                votes_path
            );
        }
        let (_, baseline_ranked) = tally_dump(&definitions, &options, &baseline)?;
        let records = diff(&baseline_ranked, &ranked).context(TallySnafu {})?;
        debug!("diff: {:?}", records);
        summary["diff"] = json!(diff_to_json(&choices, &records));
    }

    if let Some(b) = budgets {
        let allocated = run_allocation(&choices, &ranked, &options, &b).context(TallySnafu {})?;
        summary["allocation"] = json!(allocation_to_json(&choices, &allocated));
    }

    let pretty_js_stats = serde_json::to_string_pretty(&summary).context(SerializingJsonSnafu {})?;
    write_summary(&pretty_js_stats, &out)?;

    // The reference summary, if provided for comparison
    if let Some(summary_p) = check_summary_path {
        let summary_ref = read_summary(&summary_p)?;
        let pretty_js_summary_ref =
            serde_json::to_string_pretty(&summary_ref).context(SerializingJsonSnafu {})?;
        if pretty_js_summary_ref != pretty_js_stats {
            warn!("Found differences with the reference string");
            print_diff(
                pretty_js_summary_ref.as_str(),
                pretty_js_stats.as_ref(),
                "\n",
            );
            whatever!("Difference detected between calculated summary and reference summary")
        }
    }

    Ok(())
}

#[cfg(test)]
fn run_proposal_test(test_name: &str, with_baseline: bool, budgets: Option<AllocationBudgets>) {
    let _ = env_logger::builder().is_test(true).try_init();
    let test_dir = format!("{}/tests/data/{}", env!("CARGO_MANIFEST_DIR"), test_name);
    info!("Running test {}", test_name);
    let res = run_proposal(
        format!("{}/manifest.json", test_dir),
        format!("{}/votes.json", test_dir),
        if with_baseline {
            Some(format!("{}/baseline.json", test_dir))
        } else {
            None
        },
        budgets,
        Some(String::new()),
        Some(format!("{}/expected_summary.json", test_dir)),
    );
    if let Err(e) = res {
        panic!("An error occured in {}: {}", test_name, e);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn scoring(algorithm: &str) -> ManifestScoring {
        ManifestScoring {
            algorithm: algorithm.to_string(),
            copeland_points: None,
            tiebreaker: None,
            unranked_from: None,
            group_by: None,
        }
    }

    #[test]
    fn copeland_with_baseline() {
        run_proposal_test("copeland_with_baseline", true, None);
    }

    #[test]
    fn ens_spp2_allocation() {
        run_proposal_test(
            "ens_spp2_allocation",
            false,
            Some(AllocationBudgets::DEFAULT_BUDGETS),
        );
    }

    #[test]
    fn ens_spp2025a() {
        run_proposal_test("ens_spp2025a", false, None);
    }

    #[test]
    fn algorithm_names() {
        assert_eq!(
            validate_scoring(&scoring("copeland")).unwrap(),
            ScoringOptions::DEFAULT_OPTIONS
        );
        for (name, algorithm) in [
            ("copeland:ens-spp2025a", Algorithm::GroupDeduplicated),
            ("variant:ens-spp2025a", Algorithm::GroupDeduplicated),
            ("copeland:ens-spp2", Algorithm::PrecedenceAdjusted),
        ] {
            assert_eq!(validate_scoring(&scoring(name)).unwrap().algorithm, algorithm);
        }
        assert!(validate_scoring(&scoring("borda")).is_err());
    }

    #[test]
    fn scoring_fields() {
        let mut s = scoring("copeland");
        s.copeland_points = Some(vec![1.0, 0.0]);
        assert!(validate_scoring(&s).is_err());

        s.copeland_points = Some(vec![2.0, 1.0, 0.0]);
        s.tiebreaker = Some("average-support".to_string());
        s.unranked_from = Some("".to_string());
        let options = validate_scoring(&s).unwrap();
        assert_eq!(options.points, CopelandPoints::from_weights([2.0, 1.0, 0.0]));
        assert_eq!(options.tiebreaker, Tiebreaker::AverageSupport);
        assert_eq!(options.unranked_from, None);

        s.tiebreaker = Some("coin-flip".to_string());
        assert!(validate_scoring(&s).is_err());
    }

    #[test]
    fn entries() {
        let js = r#"[
            {"choice": "a", "label": "Project A", "team": "red", "budget": 100},
            {"choice": "b", "isExtended": true, "isEligibleFor2YearFunding": false}
        ]"#;
        let entries: Vec<ManifestEntry> = serde_json::from_str(js).unwrap();
        let choices = validate_entries(&entries).unwrap();
        assert_eq!(choices[0].label, "a");
        assert_eq!(choices[0].title.as_deref(), Some("Project A"));
        assert_eq!(choices[0].budget, Some(100));
        assert_eq!(choices[0].group_value("team"), Some("red"));
        assert_eq!(choices[1].is_extended, Some(true));
        assert_eq!(choices[1].is_eligible_for_long_stream, Some(false));

        let duplicated = vec![entries[0].clone(), entries[0].clone()];
        assert!(validate_entries(&duplicated).is_err());
        assert!(validate_entries(&[]).is_err());
    }

    #[test]
    fn oversized_voting_power() {
        let js = r#"{
            "choices": ["a", "b"],
            "votes": [
                {"voter": "0x01", "choice": [1, 2], "vp": 2.0e29},
                {"voter": "0x02", "choice": [2, 1], "vp": 2.0e29}
            ]
        }"#;
        let dump: VoteDump = serde_json::from_str(js).unwrap();
        assert!(matches!(
            create_ballots(&dump),
            Err(AppError::Tally {
                source: TallyError::InvalidVotingPower { .. }
            })
        ));
    }
}
