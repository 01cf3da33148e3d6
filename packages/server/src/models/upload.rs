use std::collections::BTreeMap;

use axum::body::Bytes;

use crate::error::{AppError, ItemValidationError};
use crate::utils::geo::{Coordinates, is_valid_lat, is_valid_lon};

/// Field of one upload item, addressed as `images_data[i][field]`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ItemField {
    Image,
    Address,
    Lat,
    Lon,
    Angle,
    Height,
}

impl ItemField {
    fn from_name(name: &str) -> Option<Self> {
        Some(match name {
            "image" => Self::Image,
            "address" => Self::Address,
            "lat" => Self::Lat,
            "lon" => Self::Lon,
            "angle" => Self::Angle,
            "height" => Self::Height,
            _ => return None,
        })
    }
}

/// Splits `images_data[3][lat]` into `(3, Lat)`.
pub fn parse_field_name(name: &str) -> Option<(usize, ItemField)> {
    let rest = name.strip_prefix("images_data[")?;
    let (index, rest) = rest.split_once("][")?;
    let field = rest.strip_suffix(']')?;
    let index = index.parse::<usize>().ok()?;
    Some((index, ItemField::from_name(field)?))
}

/// Raw bytes of an uploaded image part.
#[derive(Debug, Clone)]
pub struct ImagePart {
    pub bytes: Bytes,
    pub file_name: Option<String>,
    pub content_type: Option<String>,
}

impl ImagePart {
    /// Declared content type, or one guessed from the file name.
    pub fn resolved_content_type(&self) -> String {
        self.content_type
            .as_deref()
            .filter(|ct| !ct.is_empty() && *ct != "application/octet-stream")
            .map(str::to_string)
            .or_else(|| {
                self.file_name
                    .as_deref()
                    .and_then(|name| mime_guess::from_path(name).first())
                    .map(|m| m.to_string())
            })
            .unwrap_or_else(|| "application/octet-stream".to_string())
    }

    pub fn original_name(&self) -> &str {
        self.file_name
            .as_deref()
            .filter(|n| !n.trim().is_empty())
            .unwrap_or("image")
    }
}

/// Item fields as received, before validation.
#[derive(Debug, Clone, Default)]
pub struct RawUploadItem {
    pub image: Option<ImagePart>,
    pub address: Option<String>,
    pub lat: Option<String>,
    pub lon: Option<String>,
    pub angle: Option<String>,
    pub height: Option<String>,
}

impl RawUploadItem {
    pub fn set_text(&mut self, field: ItemField, value: String) {
        match field {
            ItemField::Address => self.address = Some(value),
            ItemField::Lat => self.lat = Some(value),
            ItemField::Lon => self.lon = Some(value),
            ItemField::Angle => self.angle = Some(value),
            ItemField::Height => self.height = Some(value),
            ItemField::Image => {}
        }
    }
}

/// A validated upload item.
#[derive(Debug, Clone)]
pub struct UploadItem {
    pub image: ImagePart,
    pub address: Option<String>,
    pub coordinates: Option<Coordinates>,
    pub angle: Option<f64>,
    pub height: Option<f64>,
}

/// Validates every item; any error rejects the whole batch.
///
/// Items are returned in index order. Error indexes are the ones the client sent.
pub fn validate_items(
    raw: BTreeMap<usize, RawUploadItem>,
    max_items: usize,
) -> Result<Vec<UploadItem>, AppError> {
    if raw.is_empty() {
        return Err(AppError::Validation("At least one image is required".into()));
    }
    if raw.len() > max_items {
        return Err(AppError::Validation(format!(
            "Too many images: max {max_items} per request"
        )));
    }

    let mut errors = Vec::new();
    let mut items = Vec::with_capacity(raw.len());

    for (index, item) in raw {
        let before = errors.len();

        let image = item.image.filter(|part| !part.bytes.is_empty());
        if image.is_none() {
            errors.push(ItemValidationError::new(index, "image", "Image file is required"));
        }

        let lat = parse_number(index, "lat", item.lat.as_deref(), &mut errors);
        let lon = parse_number(index, "lon", item.lon.as_deref(), &mut errors);
        let angle = parse_number(index, "angle", item.angle.as_deref(), &mut errors);
        let height = parse_number(index, "height", item.height.as_deref(), &mut errors);

        if let Some(lat) = lat
            && !is_valid_lat(lat)
        {
            errors.push(ItemValidationError::new(
                index,
                "lat",
                "Latitude must be between -90 and 90",
            ));
        }
        if let Some(lon) = lon
            && !is_valid_lon(lon)
        {
            errors.push(ItemValidationError::new(
                index,
                "lon",
                "Longitude must be between -180 and 180",
            ));
        }
        let lat_given = is_given(item.lat.as_deref());
        let lon_given = is_given(item.lon.as_deref());
        if lat_given && !lon_given {
            errors.push(ItemValidationError::new(
                index,
                "lon",
                "Longitude is required when latitude is given",
            ));
        } else if lon_given && !lat_given {
            errors.push(ItemValidationError::new(
                index,
                "lat",
                "Latitude is required when longitude is given",
            ));
        }

        if errors.len() > before {
            continue;
        }
        let Some(image) = image else { continue };

        items.push(UploadItem {
            image,
            address: item
                .address
                .map(|a| a.trim().to_string())
                .filter(|a| !a.is_empty()),
            coordinates: lat.zip(lon).and_then(|(lat, lon)| Coordinates::new(lat, lon)),
            angle,
            height,
        });
    }

    if errors.is_empty() {
        Ok(items)
    } else {
        Err(AppError::ItemValidation(errors))
    }
}

fn is_given(raw: Option<&str>) -> bool {
    raw.is_some_and(|s| !s.trim().is_empty())
}

/// Blank values count as absent.
fn parse_number(
    index: usize,
    field: &str,
    raw: Option<&str>,
    errors: &mut Vec<ItemValidationError>,
) -> Option<f64> {
    let raw = raw.map(str::trim).filter(|s| !s.is_empty())?;
    match raw.parse::<f64>() {
        Ok(v) if v.is_finite() => Some(v),
        _ => {
            errors.push(ItemValidationError::new(
                index,
                field,
                format!("{field} must be a number"),
            ));
            None
        }
    }
}
