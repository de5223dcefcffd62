use std::collections::HashMap;

use crate::domain::Resource;

#[derive(Debug, Clone, PartialEq)]
pub struct SeasonGroup {
    pub season: String,
    pub resources: Vec<Resource>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct AnimeGroup {
    pub anime_name: String,
    pub seasons: Vec<SeasonGroup>,
}

/// Partition by anime name, then season. Groups keep first-occurrence order;
/// resources without a name are left out.
pub fn group_by_season(resources: &[Resource]) -> Vec<AnimeGroup> {
    let mut groups: Vec<AnimeGroup> = Vec::new();
    let mut index: HashMap<&str, usize> = HashMap::new();

    for resource in resources {
        let Some(name) = resource.anime_name.as_deref() else {
            continue;
        };

        let slot = *index.entry(name).or_insert_with(|| {
            groups.push(AnimeGroup {
                anime_name: name.to_string(),
                seasons: Vec::new(),
            });
            groups.len() - 1
        });

        let seasons = &mut groups[slot].seasons;
        match seasons.iter_mut().find(|s| s.season == resource.season) {
            Some(group) => group.resources.push(resource.clone()),
            None => seasons.push(SeasonGroup {
                season: resource.season.clone(),
                resources: vec![resource.clone()],
            }),
        }
    }

    groups
}

/// Flat partition by anime name, in first-occurrence order.
pub fn group_by_name(resources: &[Resource]) -> Vec<(String, Vec<&Resource>)> {
    let mut groups: Vec<(String, Vec<&Resource>)> = Vec::new();
    let mut index: HashMap<&str, usize> = HashMap::new();

    for resource in resources {
        let Some(name) = resource.anime_name.as_deref() else {
            continue;
        };
        match index.get(name) {
            Some(&slot) => groups[slot].1.push(resource),
            None => {
                index.insert(name, groups.len());
                groups.push((name.to_string(), vec![resource]));
            }
        }
    }

    groups
}

#[cfg(test)]
mod tests {
    use super::*;

    fn resource(id: &str, name: Option<&str>, season: &str) -> Resource {
        let mut r = Resource::new(id, format!("{} title", id));
        r.anime_name = name.map(String::from);
        r.season = season.into();
        r
    }

    #[test]
    fn test_group_by_season() {
        let resources = vec![
            resource("a1", Some("A"), "1"),
            resource("a2", Some("A"), "2"),
            resource("b1", Some("B"), "1"),
        ];
        let groups = group_by_season(&resources);

        assert_eq!(groups.len(), 2);
        assert_eq!(groups[0].anime_name, "A");
        assert_eq!(groups[0].seasons.len(), 2);
        assert_eq!(groups[0].seasons[0].season, "1");
        assert_eq!(groups[0].seasons[0].resources[0].id, "a1");
        assert_eq!(groups[0].seasons[1].season, "2");
        assert_eq!(groups[0].seasons[1].resources[0].id, "a2");
        assert_eq!(groups[1].anime_name, "B");
        assert_eq!(groups[1].seasons.len(), 1);
        assert_eq!(groups[1].seasons[0].resources[0].id, "b1");
    }

    #[test]
    fn test_group_order_is_first_occurrence() {
        let resources = vec![
            resource("b1", Some("B"), "1"),
            resource("a1", Some("A"), "1"),
            resource("b2", Some("B"), "1"),
        ];
        let groups = group_by_season(&resources);

        assert_eq!(groups[0].anime_name, "B");
        assert_eq!(groups[0].seasons[0].resources.len(), 2);
        assert_eq!(groups[1].anime_name, "A");
    }

    #[test]
    fn test_unnamed_resources_are_skipped() {
        let resources = vec![resource("x", None, "1"), resource("a1", Some("A"), "1")];

        let groups = group_by_season(&resources);
        assert_eq!(groups.len(), 1);
        assert_eq!(groups[0].seasons[0].resources.len(), 1);

        let flat = group_by_name(&resources);
        assert_eq!(flat.len(), 1);
        assert_eq!(flat[0].0, "A");
    }

    #[test]
    fn test_group_by_name_merges_seasons() {
        let resources = vec![
            resource("a1", Some("A"), "1"),
            resource("b1", Some("B"), "1"),
            resource("a2", Some("A"), "2"),
        ];
        let flat = group_by_name(&resources);

        assert_eq!(flat.len(), 2);
        assert_eq!(flat[0].0, "A");
        let ids: Vec<&str> = flat[0].1.iter().map(|r| r.id.as_str()).collect();
        assert_eq!(ids, vec!["a1", "a2"]);
        assert_eq!(flat[1].0, "B");
    }

    #[test]
    fn test_empty_input() {
        assert!(group_by_season(&[]).is_empty());
        assert!(group_by_name(&[]).is_empty());
    }
}
