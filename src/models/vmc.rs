use serde::Deserialize;

/// Paged inventory listing
#[derive(Debug, Clone, Deserialize)]
pub struct Page<T> {
    #[serde(default = "Vec::new")]
    pub content: Vec<T>,
    #[serde(default)]
    pub empty: bool,
}

impl<T> Page<T> {
    pub fn is_empty(&self) -> bool {
        self.empty || self.content.is_empty()
    }
}

/// SDDC deployment
#[derive(Debug, Clone, Deserialize)]
pub struct Deployment {
    pub id: String,
    pub name: String,
}

/// SDDC Group
#[derive(Debug, Clone, Deserialize)]
pub struct DeploymentGroup {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub membership: Membership,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Membership {
    #[serde(default)]
    pub included: Vec<GroupMember>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct GroupMember {
    pub deployment_id: String,
}

impl DeploymentGroup {
    pub fn is_empty(&self) -> bool {
        self.membership.included.is_empty()
    }
}

/// Network connectivity config backing a group
#[derive(Debug, Clone, Deserialize)]
pub struct ConnectivityConfig {
    pub id: String,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_page_with_content() {
        let page: Page<Deployment> = serde_json::from_value(json!({
            "content": [
                { "id": "d-1", "name": "sddc-a" },
                { "id": "d-2", "name": "sddc-b" }
            ],
            "empty": false,
            "total_elements": 2
        }))
        .unwrap();

        assert!(!page.is_empty());
        assert_eq!(page.content.len(), 2);
        assert_eq!(page.content[0].id, "d-1");
        assert_eq!(page.content[1].name, "sddc-b");
    }

    #[test]
    fn test_empty_page() {
        let page: Page<Deployment> =
            serde_json::from_value(json!({ "empty": true, "total_elements": 0 })).unwrap();
        assert!(page.is_empty());
    }

    #[test]
    fn test_page_flagged_empty_with_stale_content() {
        let page: Page<Deployment> = serde_json::from_value(json!({
            "content": [ { "id": "d-1", "name": "sddc-a" } ],
            "empty": true
        }))
        .unwrap();
        assert!(page.is_empty());
    }

    #[test]
    fn test_group_without_membership() {
        let group: DeploymentGroup =
            serde_json::from_value(json!({ "id": "g-1", "name": "grp" })).unwrap();
        assert!(group.is_empty());
    }

    #[test]
    fn test_group_members() {
        let group: DeploymentGroup = serde_json::from_value(json!({
            "id": "g-1",
            "name": "grp",
            "membership": { "included": [ { "deployment_id": "d-1" } ] }
        }))
        .unwrap();
        assert!(!group.is_empty());
        assert_eq!(group.membership.included[0].deployment_id, "d-1");
    }
}
