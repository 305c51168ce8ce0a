//! Translation of placement requests for backends that predate placement.
//!
//! Older backends only understand `container_type` and `parent_id`. A
//! placement whose scope is a container type maps onto those fields; any
//! other placement has no legacy form.

use crate::params::AddMachineParams;

/// Rewrite `template` into the legacy request shape.
///
/// Returns `None` when the placement cannot be expressed without placement
/// support. A template without placement is returned unchanged.
pub fn legacy_params(template: &AddMachineParams) -> Option<AddMachineParams> {
    let Some(placement) = &template.placement else {
        return Some(template.clone());
    };
    let container_type = placement.container_type()?;

    let parent_id = (!placement.directive.is_empty()).then(|| placement.directive.clone());
    Some(AddMachineParams {
        placement: None,
        container_type: Some(container_type),
        parent_id,
        ..template.clone()
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::params::MachineJob;
    use crate::placement::Placement;
    use corral_id::ContainerType;
    use rstest::rstest;

    fn template(placement: Option<Placement>) -> AddMachineParams {
        AddMachineParams {
            series: Some("jammy".to_string()),
            jobs: vec![MachineJob::HostUnits],
            placement,
            ..Default::default()
        }
    }

    #[test]
    fn test_no_placement_unchanged() {
        let template = template(None);
        assert_eq!(legacy_params(&template), Some(template));
    }

    #[rstest]
    #[case("lxc", "4", ContainerType::Lxc, Some("4"))]
    #[case("kvm", "0/lxc/1", ContainerType::Kvm, Some("0/lxc/1"))]
    #[case("lxc", "", ContainerType::Lxc, None)]
    fn test_container_scope_translated(
        #[case] scope: &str,
        #[case] directive: &str,
        #[case] container_type: ContainerType,
        #[case] parent_id: Option<&str>,
    ) {
        let legacy = legacy_params(&template(Some(Placement::new(scope, directive)))).unwrap();
        assert_eq!(legacy.placement, None);
        assert_eq!(legacy.container_type, Some(container_type));
        assert_eq!(legacy.parent_id.as_deref(), parent_id);
        assert_eq!(legacy.series.as_deref(), Some("jammy"));
        assert_eq!(legacy.jobs, vec![MachineJob::HostUnits]);
    }

    #[rstest]
    #[case("deadbeef", "zone=us-east-1a")]
    #[case("maas", "node-7")]
    fn test_other_scopes_untranslatable(#[case] scope: &str, #[case] directive: &str) {
        assert_eq!(
            legacy_params(&template(Some(Placement::new(scope, directive)))),
            None
        );
    }
}
