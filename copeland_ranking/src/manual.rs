/*!

This is the long-form manual for `copeland_ranking` and `copeland`.

## Input formats

The command line tool reads two JSON files: a manifest that describes the choices and
how to score them, and a dump of the votes.

### Manifest

```json
{
  "version": "1.0.0",
  "scoring": {
    "algorithm": "copeland:ens-spp2",
    "copelandPoints": [1, 0.5, 0],
    "tiebreaker": "average-support",
    "unrankedFrom": "None Below",
    "groupBy": "group"
  },
  "entries": [
    { "choice": "sp-a-basic", "label": "Project A (basic)", "group": "A",
      "isExtended": false, "isEligibleFor2YearFunding": true, "budget": 400000 },
    { "choice": "sp-a-extended", "group": "A",
      "isExtended": true, "isEligibleFor2YearFunding": true, "budget": 250000 },
    { "choice": "None Below", "group": "None Below",
      "isExtended": false, "isEligibleFor2YearFunding": false, "budget": 0 }
  ]
}
```

Notes:
- `choice` is the identity of the entry. It must be unique.
- `label` defaults to `choice`.
- `copelandPoints` are the points for a win, a tie and a loss. It defaults to `[1, 0.5, 0]`.
- `tiebreaker` is `average-support` or `total-support` (the default).
- any other string field of an entry can be used as `groupBy`.

### Votes

The votes follow the format of the governance platform. The choices are listed once,
in the order that numbers them: the first choice is `1`.

```json
{
  "choices": ["sp-a-basic", "sp-a-extended", "None Below"],
  "votes": [
    { "voter": "0x0a", "choice": [2, 1, 3], "vp": 1520.5 },
    { "voter": "0x0b", "choice": [1], "vp": 80 }
  ]
}
```

## Algorithms

### `copeland`

Every pair of choices is compared. For each pair, a ballot gives its voting power to
the choice it ranks higher. A choice that is ranked always beats a choice that is not.
The choice that receives more power wins the matchup, and equal power is a tie.

The points of a choice are `win * wins + tie * ties + loss * losses`. Choices are ranked
by points, and then by the tiebreaker:
- `average-support`: the power received over all the contested matchups, divided by
  their number
- `total-support`: the power received over all the matchups

If `unrankedFrom` is set, the marker choice and everything ranked below it are removed
from the ballots before counting.

### `copeland:ens-spp2025a`

Also accepted as `variant:ens-spp2025a`. Requires `groupBy` and `unrankedFrom`.

On every ballot, the choices of the same group are brought next to the first of them.
The ballots are then truncated at the marker, and counted as above. Only the best
ranked entry of each group is kept in the results. `[1, 0, 0]` is the usual set of
points for this variant, so that ties do not inflate the scores before deduplication.

### `copeland:ens-spp2`

Requires `groupBy`, `unrankedFrom`, and `isExtended` and `isEligibleFor2YearFunding`
on every entry.

A group has at most one basic and one extended scope. On every ballot that ranks the
basic scope below the extended one, the basic scope is moved right above it. The
ballots are then truncated below the marker. The marker stays on the ballot, so the
voter's choices above it beat it. The results are not deduplicated.

## Allocation

With `--allocate`, the ranked entries are funded in rank order until the marker is
reached. The pools default to 4,500,000 in total, of which 1,500,000 can be paid over
two years.
- an extended scope is only funded after the basic scope of its group
- an entry eligible for two-year funding, within the first 10 ranks, is paid from the
  two-year stream if it still fits
- otherwise it is paid from the general pool if it fits
- an entry that does not fit is skipped, and the following ones are still considered

Every entry must define `group`, `budget`, `isExtended` and `isEligibleFor2YearFunding`.

## Comparing two tallies

With `--baseline`, a second votes file is tallied with the same manifest, and the
summary lists for each choice how its rank and statistics changed. A negative rank
change means that the choice moved up. If nobody had voted in the baseline, the
summary shows the new values and a rank change of 0.

*/
