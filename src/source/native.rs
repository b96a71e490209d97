//! Native HDF5 reader, built on libhdf5.

use super::SourceError;
use crate::coerce::coerce_dataset;
use crate::types::{Attributes, ContainerTree, DataType, DatasetInfo, ObjectKind, Payload, RawScalar, TreeNode};
use ::hdf5::types::{TypeDescriptor, VarLenAscii, VarLenUnicode};
use ::hdf5::{Container, File, Group, Location, LocationType};
use std::path::Path;

/// Read an HDF5 file into a tree. The file is closed when this returns.
pub fn read(path: &Path) -> Result<ContainerTree, SourceError> {
    let malformed = |e: ::hdf5::Error| SourceError::Malformed {
        path: path.to_path_buf(),
        reason: e.to_string(),
    };

    let file = File::open(path).map_err(malformed)?;
    let attributes = read_attributes(&file);
    let members = read_members(&file, "").map_err(malformed)?;

    Ok(ContainerTree {
        filepath: path.to_path_buf(),
        attributes,
        members,
    })
}

fn read_members(group: &Group, prefix: &str) -> ::hdf5::Result<Vec<TreeNode>> {
    let mut nodes = Vec::new();
    for name in group.member_names()? {
        let path = format!("{}/{}", prefix, name);

        let (attributes, kind) = match group.loc_type_by_name(&name) {
            Ok(LocationType::Group) => {
                let child = group.group(&name)?;
                let children = read_members(&child, &path)?;
                (read_attributes(&child), ObjectKind::Group { children })
            }
            Ok(LocationType::Dataset) => {
                let dataset = group.dataset(&name)?;
                (read_attributes(&dataset), ObjectKind::Dataset(read_info(&dataset)))
            }
            Ok(LocationType::NamedDatatype) => (Attributes::new(), ObjectKind::NamedDatatype),
            // Dangling soft or external link.
            Err(e) => {
                log::debug!("Cannot resolve {}: {}", path, e);
                (Attributes::new(), ObjectKind::SoftLink { target: String::new() })
            }
        };

        nodes.push(TreeNode {
            name,
            path,
            attributes,
            kind,
        });
    }
    Ok(nodes)
}

fn data_type(descriptor: &TypeDescriptor) -> DataType {
    match descriptor {
        TypeDescriptor::Boolean => DataType::Bool,
        TypeDescriptor::Integer(_) => DataType::Int,
        TypeDescriptor::Unsigned(_) => DataType::Uint,
        TypeDescriptor::Float(_) => DataType::Float,
        TypeDescriptor::VarLenAscii | TypeDescriptor::VarLenUnicode => DataType::String,
        TypeDescriptor::FixedAscii(_) | TypeDescriptor::FixedUnicode(_) => DataType::FixedString,
        TypeDescriptor::Enum(_) => DataType::Enum,
        TypeDescriptor::Compound(_) => DataType::Compound,
        TypeDescriptor::FixedArray(..) | TypeDescriptor::VarLenArray(_) => DataType::Array,
        #[allow(unreachable_patterns)]
        _ => DataType::Opaque,
    }
}

/// Shape and type of a dataset or attribute, with the element loaded for scalars only.
fn read_info(container: &Container) -> DatasetInfo {
    let shape = container.shape();
    let descriptor = match container.dtype().and_then(|t| t.to_descriptor()) {
        Ok(d) => d,
        Err(e) => {
            return DatasetInfo {
                dtype: DataType::Opaque,
                shape,
                payload: Payload::Unreadable(e.to_string()),
            };
        }
    };
    let dtype = data_type(&descriptor);

    let payload = if !shape.is_empty() {
        Payload::Unread
    } else if container.size() == 0 {
        Payload::Empty
    } else {
        read_scalar(container, &descriptor)
    };

    DatasetInfo { dtype, shape, payload }
}

fn read_scalar(container: &Container, descriptor: &TypeDescriptor) -> Payload {
    let raw = match descriptor {
        TypeDescriptor::Boolean => container.read_scalar::<bool>().map(RawScalar::Bool),
        TypeDescriptor::Integer(_) => container.read_scalar::<i64>().map(RawScalar::Int),
        TypeDescriptor::Unsigned(_) => container.read_scalar::<u64>().map(RawScalar::Uint),
        TypeDescriptor::Float(_) => container.read_scalar::<f64>().map(RawScalar::Float),
        TypeDescriptor::VarLenAscii => container
            .read_scalar::<VarLenAscii>()
            .map(|s| RawScalar::Text(s.as_str().to_owned())),
        TypeDescriptor::VarLenUnicode | TypeDescriptor::FixedAscii(_) | TypeDescriptor::FixedUnicode(_) => container
            .read_scalar::<VarLenUnicode>()
            .map(|s| RawScalar::Text(s.as_str().to_owned())),
        _ => return Payload::Unread,
    };

    match raw {
        Ok(raw) => Payload::Scalar(raw),
        Err(e) => Payload::Unreadable(e.to_string()),
    }
}

fn read_attributes(location: &Location) -> Attributes {
    let names = match location.attr_names() {
        Ok(names) => names,
        Err(e) => {
            log::warn!("Cannot list attributes of {}: {}", location.name(), e);
            return Attributes::new();
        }
    };

    let mut attributes = Attributes::new();
    for name in names {
        let Ok(attr) = location.attr(&name) else {
            continue;
        };
        if let Some(value) = coerce_dataset(&read_info(&attr)) {
            attributes.insert(name, value);
        }
    }
    attributes
}
