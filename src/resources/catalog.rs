use super::{Catalog, Projection, ResourceDescriptor};

/// Teacher records carry their photo as a path relative to the backend origin.
const TEACHER_ASSET_FIELDS: &[&str] = &["foto"];

/// Families forwarded by the admin console, mounted under `/api`.
pub fn default_catalog() -> Catalog {
    Catalog::new(vec![
        ResourceDescriptor::crud("schools", "sekolah", "/sekolah", "/sekolah/{id}")
            .multipart()
            .paginated(),
        ResourceDescriptor::crud("teachers", "guru", "/guru", "/guru/{id}")
            .multipart()
            .paginated()
            .with_projection(Projection::AbsoluteAssetUrls(TEACHER_ASSET_FIELDS)),
        ResourceDescriptor::crud("classes", "kelas", "/kelas", "/kelas/{id}").paginated(),
        ResourceDescriptor::list_only("students-by-class", "siswa", "/kelas/{id}/siswa")
            .paginated(),
        ResourceDescriptor::crud("subjects", "mapel", "/mapel", "/mapel/{id}").paginated(),
        ResourceDescriptor::crud("domains", "domains", "/domains", "/domains/{id}").paginated(),
        ResourceDescriptor::crud("admins", "admin", "/admins", "/admins/{id}"),
        ResourceDescriptor::crud(
            "maintenance",
            "maintenance",
            "/maintenance",
            "/maintenance/{id}",
        )
        .paginated(),
        ResourceDescriptor::public_detail(
            "maintenance-check",
            "maintenance status",
            "/maintenance/check/sekolah/{id}",
        ),
        ResourceDescriptor::crud("packages", "paket", "/paket", "/paket/{id}"),
        ResourceDescriptor::list_only("provinces", "provinsi", "/wilayah/provinsi"),
        ResourceDescriptor::list_only("cities", "kota", "/wilayah/provinsi/{id}/kota"),
        ResourceDescriptor::list_only("districts", "kecamatan", "/wilayah/kota/{id}/kecamatan"),
    ])
}

#[cfg(test)]
mod tests {
    use std::collections::HashSet;

    use super::*;
    use crate::resources::{Access, BodyEncoding, ListShape, Operation};

    #[test]
    fn routes_are_unique_per_method() {
        let catalog = default_catalog();
        let mut seen = HashSet::new();

        for descriptor in catalog.iter() {
            for route in &descriptor.routes {
                assert!(
                    seen.insert((route.path, route.operation.method())),
                    "duplicate route {} {}",
                    route.operation.method(),
                    route.path
                );
            }
        }
    }

    #[test]
    fn routes_carry_at_most_one_path_param() {
        for descriptor in default_catalog().iter() {
            for route in &descriptor.routes {
                assert!(route.path.matches("{id}").count() <= 1, "{}", route.path);
            }
        }
    }

    #[test]
    fn only_maintenance_check_is_public() {
        let public: Vec<_> = default_catalog()
            .iter()
            .flat_map(|d| d.routes.iter().copied())
            .filter(|r| r.access == Access::Public)
            .collect();

        assert_eq!(public.len(), 1);
        assert_eq!(public[0].path, "/maintenance/check/sekolah/{id}");
        assert_eq!(public[0].operation, Operation::Detail);
    }

    #[test]
    fn schools_and_teachers_use_multipart() {
        let catalog = default_catalog();
        for descriptor in catalog.iter() {
            let expected = if matches!(descriptor.family, "schools" | "teachers") {
                BodyEncoding::Multipart
            } else {
                BodyEncoding::Json
            };
            assert_eq!(descriptor.body, expected, "{}", descriptor.family);
        }
    }

    #[test]
    fn list_shapes_follow_the_family() {
        let catalog = default_catalog();
        for family in [
            "schools",
            "teachers",
            "classes",
            "students-by-class",
            "subjects",
            "domains",
            "maintenance",
        ] {
            assert_eq!(catalog.find(family).unwrap().list_shape, ListShape::Paginated);
        }
        for family in ["admins", "packages", "provinces", "cities", "districts"] {
            assert_eq!(catalog.find(family).unwrap().list_shape, ListShape::Passthrough);
        }
    }

    #[test]
    fn teacher_photo_is_projected() {
        let teachers = default_catalog().find("teachers").unwrap();
        assert_eq!(
            teachers.projection,
            Projection::AbsoluteAssetUrls(&["foto"])
        );
    }
}
