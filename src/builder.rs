//! Turns a parsed definition document into a provider draft.
//!
//! Every element kind starts from its delivery-system defaults and applies
//! attribute overrides. Items that end up without one of their required
//! fields are dropped; there is no partial merge.

use std::collections::BTreeMap;

use tracing::debug;

use crate::error::FieldIssue;
use crate::model::{
    BouquetConfig, CableBouquet, Protocol, SatelliteBouquet, SatelliteTransponder, SwapChannel,
    TableIds, TerrestrialBouquet, Transponder, frontend,
};
use crate::xml::{Document, Element};

/// Everything recovered from one definition file, before validation.
///
/// Mandatory fields are `Option`s here; the validator decides whether the
/// draft becomes a [`crate::Provider`].
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ProviderDraft {
    pub key: String,
    pub name: Option<String>,
    pub streamtype: Option<String>,
    pub protocol: Option<Protocol>,
    pub bouquettype: Option<String>,
    pub netid: Option<String>,
    pub transponder: Option<Transponder>,
    pub bouquets: BTreeMap<String, BouquetConfig>,
    pub sections: Option<BTreeMap<i32, String>>,
    pub servicehacks: Option<String>,
    pub swapchannels: Vec<SwapChannel>,
    pub dependent: String,
    pub ignore_visible_service_flag: bool,
}

impl ProviderDraft {
    pub fn new(key: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            ..Self::default()
        }
    }
}

/// Draft plus the attribute values that could not be decoded.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BuildOutput {
    pub draft: ProviderDraft,
    pub issues: Vec<FieldIssue>,
}

/// Build the draft for the provider `key` from its definition document.
pub fn build_provider(key: &str, document: &Document) -> BuildOutput {
    let mut builder = RecordBuilder {
        draft: ProviderDraft::new(key),
        candidates: Vec::new(),
        issues: Vec::new(),
    };

    if document.root.name == "provider" {
        for element in document.root.child_elements() {
            builder.apply(element);
        }
    } else {
        debug!(key, root = %document.root.name, "document element is not <provider>");
    }

    builder.finish()
}

#[derive(Debug, Clone, Copy)]
enum Radix {
    Decimal,
    Hexadecimal,
}

impl Radix {
    fn describe(self) -> &'static str {
        match self {
            Radix::Decimal => "decimal",
            Radix::Hexadecimal => "hexadecimal",
        }
    }
}

/// Integer parsing with the leniency of the definition files' authors:
/// surrounding whitespace, an explicit sign, and an optional `0x` prefix on
/// hexadecimal values.
fn parse_integer(raw: &str, radix: Radix) -> Option<i64> {
    let trimmed = raw.trim();
    let (negative, digits) = match trimmed.as_bytes().first() {
        Some(b'-') => (true, &trimmed[1..]),
        Some(b'+') => (false, &trimmed[1..]),
        _ => (false, trimmed),
    };
    let (digits, base) = match radix {
        Radix::Decimal => (digits, 10),
        Radix::Hexadecimal => (
            digits
                .strip_prefix("0x")
                .or_else(|| digits.strip_prefix("0X"))
                .unwrap_or(digits),
            16,
        ),
    };
    if digits.is_empty() || !digits.chars().all(|c| c.is_digit(base)) {
        return None;
    }

    let value = i64::from_str_radix(digits, base).ok()?;
    Some(if negative { -value } else { value })
}

/// Section and channel numbers equal to this are treated as absent.
const UNSET_NUMBER: i32 = -1;

/// Decodes the numeric attributes of one element, remembering failures.
struct Attributes<'a> {
    element: &'static str,
    issues: &'a mut Vec<FieldIssue>,
    failed: bool,
}

impl<'a> Attributes<'a> {
    fn new(element: &'static str, issues: &'a mut Vec<FieldIssue>) -> Self {
        Self {
            element,
            issues,
            failed: false,
        }
    }

    fn number<T: TryFrom<i64>>(&mut self, name: &str, value: &str, radix: Radix) -> Option<T> {
        let parsed = parse_integer(value, radix).and_then(|number| T::try_from(number).ok());
        if parsed.is_none() {
            self.failed = true;
            self.issues.push(FieldIssue::InvalidNumber {
                element: self.element,
                attribute: name.to_string(),
                value: value.to_string(),
                expected: radix.describe(),
            });
        }
        parsed
    }

    fn dec<T: TryFrom<i64>>(&mut self, name: &str, value: &str, slot: &mut T) {
        if let Some(number) = self.number(name, value, Radix::Decimal) {
            *slot = number;
        }
    }

    fn hex<T: TryFrom<i64>>(&mut self, name: &str, value: &str, slot: &mut T) {
        if let Some(number) = self.number(name, value, Radix::Hexadecimal) {
            *slot = number;
        }
    }

    fn dec_opt<T: TryFrom<i64>>(&mut self, name: &str, value: &str, slot: &mut Option<T>) {
        if let Some(number) = self.number(name, value, Radix::Decimal) {
            *slot = Some(number);
        }
    }

    fn hex_opt<T: TryFrom<i64>>(&mut self, name: &str, value: &str, slot: &mut Option<T>) {
        if let Some(number) = self.number(name, value, Radix::Hexadecimal) {
            *slot = Some(number);
        }
    }

    /// True when some attribute of this element failed to decode.
    fn failed(&self) -> bool {
        self.failed
    }
}

fn text_of(element: &Element) -> Option<String> {
    element.sole_text().map(str::to_owned)
}

/// A bouquet entry waiting for the final protocol before it is admitted.
enum Candidate {
    Ready(BouquetConfig),
    Cable(CableBouquet),
}

struct RecordBuilder {
    draft: ProviderDraft,
    candidates: Vec<Candidate>,
    issues: Vec<FieldIssue>,
}

impl RecordBuilder {
    fn apply(&mut self, element: &Element) {
        match element.name.as_str() {
            "name" => self.draft.name = text_of(element).or(self.draft.name.take()),
            "streamtype" => {
                self.draft.streamtype = text_of(element).or(self.draft.streamtype.take())
            }
            "bouquettype" => {
                self.draft.bouquettype = text_of(element).or(self.draft.bouquettype.take())
            }
            "netid" => self.draft.netid = text_of(element).or(self.draft.netid.take()),
            "dependent" => {
                if let Some(dependent) = text_of(element) {
                    self.draft.dependent = dependent;
                }
            }
            "protocol" => {
                if let Some(protocol) = element.sole_text().and_then(|text| text.parse().ok()) {
                    self.draft.protocol = Some(protocol);
                }
            }
            "transponder" => {
                if let Some(transponder) = self.satellite_transponder(element) {
                    self.draft.transponder = Some(transponder);
                }
            }
            "dvbsconfigs" => {
                for configuration in element.children_named("configuration") {
                    if let Some(bouquet) = satellite_bouquet(configuration, &mut self.issues) {
                        self.candidates
                            .push(Candidate::Ready(BouquetConfig::Satellite(bouquet)));
                    }
                }
            }
            "dvbcconfigs" => {
                self.draft.transponder = Some(Transponder::Cable(TableIds::default()));
                for configuration in element.children_named("configuration") {
                    if let Some(bouquet) = cable_bouquet(configuration, &mut self.issues) {
                        self.candidates.push(Candidate::Cable(bouquet));
                    }
                }
            }
            "dvbtconfigs" => {
                self.draft.transponder = Some(Transponder::Terrestrial(TableIds::terrestrial()));
                for configuration in element.children_named("configuration") {
                    if let Some(bouquet) = terrestrial_bouquet(configuration, &mut self.issues) {
                        self.candidates
                            .push(Candidate::Ready(BouquetConfig::Terrestrial(bouquet)));
                    }
                }
            }
            "sections" => self.draft.sections = Some(self.sections(element)),
            "swapchannels" => self.swapchannels(element),
            "servicehacks" => {
                if let Some(code) = element.last_cdata() {
                    self.draft.servicehacks = Some(code.trim().to_string());
                }
            }
            "visibleserviceflag" => self.visible_service_flag(element),
            _ => {}
        }
    }

    fn satellite_transponder(&mut self, element: &Element) -> Option<Transponder> {
        let mut tables = TableIds::default();
        let mut fastscan_pid = 0;
        let mut fastscan_table_id = 0;
        let mut frequency = None;
        let mut symbol_rate = None;
        let mut orbital_position = None;
        let mut polarization = frontend::satellite::POLARISATION_HORIZONTAL;
        let mut fec_inner = frontend::satellite::FEC_AUTO;
        let mut inversion = frontend::satellite::INVERSION_UNKNOWN;
        let mut system = frontend::satellite::SYSTEM_DVB_S;
        let mut modulation = frontend::satellite::MODULATION_QPSK;
        let mut roll_off = frontend::satellite::ROLL_OFF_ALPHA_0_35;
        let mut pilot = frontend::satellite::PILOT_UNKNOWN;
        let mut onid = None;
        let mut tsid = None;

        let mut attrs = Attributes::new("transponder", &mut self.issues);
        for (name, value) in element.attributes() {
            match name {
                "frequency" => attrs.dec_opt(name, value, &mut frequency),
                "symbol_rate" => attrs.dec_opt(name, value, &mut symbol_rate),
                "orbital_position" => attrs.dec_opt(name, value, &mut orbital_position),
                "polarization" => attrs.dec(name, value, &mut polarization),
                "fec_inner" => attrs.dec(name, value, &mut fec_inner),
                "inversion" => attrs.dec(name, value, &mut inversion),
                "system" => attrs.dec(name, value, &mut system),
                "modulation" => attrs.dec(name, value, &mut modulation),
                "roll_off" => attrs.dec(name, value, &mut roll_off),
                "pilot" => attrs.dec(name, value, &mut pilot),
                "onid" => attrs.dec_opt(name, value, &mut onid),
                "tsid" => attrs.dec_opt(name, value, &mut tsid),
                "nit_pid" => attrs.hex(name, value, &mut tables.nit_pid),
                "nit_current_table_id" => attrs.hex(name, value, &mut tables.nit_current_table_id),
                "nit_other_table_id" => attrs.hex(name, value, &mut tables.nit_other_table_id),
                "sdt_pid" => attrs.hex(name, value, &mut tables.sdt_pid),
                "sdt_current_table_id" => attrs.hex(name, value, &mut tables.sdt_current_table_id),
                "sdt_other_table_id" => attrs.hex(name, value, &mut tables.sdt_other_table_id),
                "bat_pid" => attrs.hex(name, value, &mut tables.bat_pid),
                "bat_table_id" => attrs.hex(name, value, &mut tables.bat_table_id),
                "fastscan_pid" => attrs.hex(name, value, &mut fastscan_pid),
                "fastscan_table_id" => attrs.hex(name, value, &mut fastscan_table_id),
                _ => {}
            }
        }
        if attrs.failed() {
            return None;
        }

        let (Some(frequency), Some(symbol_rate), Some(orbital_position)) =
            (frequency, symbol_rate, orbital_position)
        else {
            debug!(
                key = %self.draft.key,
                "transponder needs frequency, symbol_rate and orbital_position"
            );
            return None;
        };

        Some(Transponder::Satellite(SatelliteTransponder {
            tables,
            fastscan_pid,
            fastscan_table_id,
            frequency,
            symbol_rate,
            polarization,
            fec_inner,
            orbital_position,
            inversion,
            system,
            modulation,
            roll_off,
            pilot,
            onid,
            tsid,
        }))
    }

    fn sections(&mut self, element: &Element) -> BTreeMap<i32, String> {
        let mut sections = BTreeMap::new();

        for section in element.children_named("section") {
            let mut number = None;
            let mut attrs = Attributes::new("section", &mut self.issues);
            if let Some(value) = section.attribute("number") {
                attrs.dec_opt("number", value, &mut number);
            }
            let Some(number) = number.filter(|&number| number != UNSET_NUMBER) else {
                continue;
            };

            if let Some(text) = text_of(section) {
                sections.insert(number, text);
            }
        }

        sections
    }

    fn swapchannels(&mut self, element: &Element) {
        for channel in element.children_named("channel") {
            let mut number = None;
            let mut with = None;
            let mut conditional = None;

            let mut attrs = Attributes::new("channel", &mut self.issues);
            for (name, value) in channel.attributes() {
                match name {
                    "number" => attrs.dec_opt(name, value, &mut number),
                    "with" => attrs.dec_opt(name, value, &mut with),
                    "conditional" => conditional = Some(value.to_string()),
                    _ => {}
                }
            }
            if attrs.failed() {
                continue;
            }

            if let (Some(number), Some(with)) = (
                number.filter(|&number| number != UNSET_NUMBER),
                with.filter(|&with| with != UNSET_NUMBER),
            ) {
                self.draft.swapchannels.push(SwapChannel {
                    number,
                    with,
                    conditional,
                });
            }
        }
    }

    fn visible_service_flag(&mut self, element: &Element) {
        let Some(value) = element.attribute("ignore") else {
            return;
        };
        let mut ignore: Option<i64> = None;
        Attributes::new("visibleserviceflag", &mut self.issues).dec_opt(
            "ignore",
            value,
            &mut ignore,
        );
        if ignore.is_some_and(|ignore| ignore != 0) {
            self.draft.ignore_visible_service_flag = true;
        }
    }

    /// Admit the collected bouquets now that the protocol is final.
    fn finish(mut self) -> BuildOutput {
        let protocol = self.draft.protocol;

        for candidate in self.candidates {
            let bouquet = match candidate {
                Candidate::Ready(bouquet) => bouquet,
                Candidate::Cable(cable) if cable_matches_protocol(&cable, protocol) => {
                    BouquetConfig::Cable(cable)
                }
                Candidate::Cable(cable) => {
                    debug!(
                        key = %self.draft.key,
                        configuration = %cable.key,
                        "cable configuration does not fit the provider protocol"
                    );
                    continue;
                }
            };
            self.draft
                .bouquets
                .insert(bouquet.key().to_string(), bouquet);
        }

        BuildOutput {
            draft: self.draft,
            issues: self.issues,
        }
    }
}

/// LCN-BAT protocols need both bouquet and region; every other protocol
/// must have neither.
fn cable_matches_protocol(cable: &CableBouquet, protocol: Option<Protocol>) -> bool {
    let lcnbat = protocol.is_some_and(Protocol::is_lcnbat);
    match (cable.bouquet, cable.region) {
        (Some(_), Some(_)) => lcnbat,
        (None, None) => !lcnbat,
        _ => false,
    }
}

fn satellite_bouquet(element: &Element, issues: &mut Vec<FieldIssue>) -> Option<SatelliteBouquet> {
    let mut key = None;
    let mut bouquet = None;
    let mut region = None;

    let mut attrs = Attributes::new("configuration", issues);
    for (name, value) in element.attributes() {
        match name {
            "key" => key = Some(value.to_string()),
            "bouquet" => attrs.hex_opt(name, value, &mut bouquet),
            "region" => attrs.hex_opt(name, value, &mut region),
            _ => {}
        }
    }
    if attrs.failed() {
        return None;
    }

    Some(SatelliteBouquet {
        key: key?,
        name: text_of(element)?,
        bouquet: bouquet?,
        region: region?,
    })
}

fn cable_bouquet(element: &Element, issues: &mut Vec<FieldIssue>) -> Option<CableBouquet> {
    let mut key = None;
    let mut netid = None;
    let mut bouquettype = None;
    let mut frequency = None;
    let mut symbol_rate = None;
    let mut system = None;
    let mut fec_inner = frontend::cable::FEC_AUTO;
    let mut inversion = frontend::cable::INVERSION_UNKNOWN;
    let mut modulation = frontend::cable::MODULATION_AUTO;
    let mut onid = None;
    let mut tsid = None;
    let mut bouquet = None;
    let mut region = None;

    let mut attrs = Attributes::new("configuration", issues);
    for (name, value) in element.attributes() {
        match name {
            "key" => key = Some(value.to_string()),
            "bouquettype" => bouquettype = Some(value.to_string()),
            "netid" => attrs.dec_opt(name, value, &mut netid),
            "frequency" => attrs.dec_opt(name, value, &mut frequency),
            "symbol_rate" => attrs.dec_opt(name, value, &mut symbol_rate),
            "system" => attrs.dec_opt(name, value, &mut system),
            "fec_inner" => attrs.dec(name, value, &mut fec_inner),
            "inversion" => attrs.dec(name, value, &mut inversion),
            "modulation" => attrs.dec(name, value, &mut modulation),
            "onid" => attrs.dec_opt(name, value, &mut onid),
            "tsid" => attrs.dec_opt(name, value, &mut tsid),
            "bouquet" => attrs.hex_opt(name, value, &mut bouquet),
            "region" => attrs.hex_opt(name, value, &mut region),
            _ => {}
        }
    }
    if attrs.failed() {
        return None;
    }

    Some(CableBouquet {
        key: key?,
        name: text_of(element)?,
        netid: netid?,
        bouquettype: bouquettype?,
        frequency: frequency?,
        symbol_rate: symbol_rate?,
        fec_inner,
        inversion,
        system: system?,
        modulation,
        onid,
        tsid,
        bouquet,
        region,
    })
}

fn terrestrial_bouquet(
    element: &Element,
    issues: &mut Vec<FieldIssue>,
) -> Option<TerrestrialBouquet> {
    let mut key = None;
    let mut frequency = None;
    let mut system = frontend::terrestrial::SYSTEM_DVB_T;
    let mut inversion = frontend::terrestrial::INVERSION_UNKNOWN;
    let mut modulation = frontend::terrestrial::MODULATION_AUTO;
    let mut bandwidth = frontend::terrestrial::BANDWIDTH_8MHZ;
    let mut code_rate_hp = frontend::terrestrial::FEC_AUTO;
    let mut code_rate_lp = frontend::terrestrial::FEC_AUTO;
    let mut transmission_mode = frontend::terrestrial::TRANSMISSION_MODE_AUTO;
    let mut guard_interval = frontend::terrestrial::GUARD_INTERVAL_AUTO;
    let mut hierarchy = frontend::terrestrial::HIERARCHY_AUTO;
    let mut onid = None;
    let mut tsid = None;

    let mut attrs = Attributes::new("configuration", issues);
    for (name, value) in element.attributes() {
        match name {
            "key" => key = Some(value.to_string()),
            "frequency" => attrs.dec_opt(name, value, &mut frequency),
            "system" => attrs.dec(name, value, &mut system),
            "inversion" => attrs.dec(name, value, &mut inversion),
            "modulation" => attrs.dec(name, value, &mut modulation),
            "bandwidth" => attrs.dec(name, value, &mut bandwidth),
            "code_rate_hp" => attrs.dec(name, value, &mut code_rate_hp),
            "code_rate_lp" => attrs.dec(name, value, &mut code_rate_lp),
            "transmission_mode" => attrs.dec(name, value, &mut transmission_mode),
            "guard_interval" => attrs.dec(name, value, &mut guard_interval),
            "hierarchy" => attrs.dec(name, value, &mut hierarchy),
            "onid" => attrs.dec_opt(name, value, &mut onid),
            "tsid" => attrs.dec_opt(name, value, &mut tsid),
            _ => {}
        }
    }
    if attrs.failed() {
        return None;
    }

    Some(TerrestrialBouquet {
        key: key?,
        name: text_of(element)?,
        frequency: frequency?,
        system,
        inversion,
        modulation,
        bandwidth,
        code_rate_hp,
        code_rate_lp,
        transmission_mode,
        guard_interval,
        hierarchy,
        onid,
        tsid,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    const SATELLITE: &str = r#"<?xml version="1.0" encoding="utf-8"?>
<provider>
	<name>Test Sat</name>
	<streamtype>1</streamtype>
	<protocol>sky</protocol>
	<transponder
		frequency="11778000"
		symbol_rate="27500000"
		polarization="1"
		fec_inner="2"
		orbital_position="282"
		inversion="2"
		system="0"
		modulation="1"
		roll_off="0"
		pilot="2"
		nit_pid="0x10"
		nit_current_table_id="0x40"
		nit_other_table_id="0x41"
		sdt_pid="0x11"
		sdt_current_table_id="0x42"
		sdt_other_table_id="0x46"
		bat_pid="0x11"
		bat_table_id="0x4a"
	/>
	<sections></sections>
	<dvbsconfigs>
		<configuration key="1" bouquet="1" region="0">Test</configuration>
	</dvbsconfigs>
	<servicehacks>
<![CDATA[True]]>
	</servicehacks>
</provider>
"#;

    fn build(content: &str) -> BuildOutput {
        build_provider("test", &Document::parse(content).unwrap())
    }

    fn cable_provider(protocol: &str, configuration: &str) -> String {
        format!(
            r#"<provider>
	<name>Cable</name>
	<protocol>{protocol}</protocol>
	<dvbcconfigs>
		{configuration}
	</dvbcconfigs>
</provider>"#
        )
    }

    const CABLE_WITH_BAT: &str = r#"<configuration key="ziggo" netid="1000" bouquettype="tv" frequency="474000" symbol_rate="6875000" system="0" bouquet="0x10" region="0x1">Ziggo</configuration>"#;
    const CABLE_PLAIN: &str = r#"<configuration key="ziggo" netid="1000" bouquettype="tv" frequency="474000" symbol_rate="6875000" system="0">Ziggo</configuration>"#;

    #[test]
    fn test_minimal_satellite_provider() {
        let output = build(SATELLITE);
        let draft = output.draft;

        assert!(output.issues.is_empty());
        assert_eq!(draft.key, "test");
        assert_eq!(draft.name.as_deref(), Some("Test Sat"));
        assert_eq!(draft.streamtype.as_deref(), Some("1"));
        assert_eq!(draft.protocol, Some(Protocol::Sky));
        assert_eq!(draft.servicehacks.as_deref(), Some("True"));
        assert_eq!(draft.sections, Some(BTreeMap::new()));
        assert_eq!(draft.dependent, "");
        assert!(!draft.ignore_visible_service_flag);

        let bouquet = &draft.bouquets["1"];
        assert_eq!(bouquet.name(), "Test");
        assert_eq!(
            bouquet,
            &BouquetConfig::Satellite(SatelliteBouquet {
                key: "1".to_string(),
                name: "Test".to_string(),
                bouquet: 1,
                region: 0,
            })
        );

        match draft.transponder {
            Some(Transponder::Satellite(transponder)) => {
                assert_eq!(transponder.frequency, 11778000);
                assert_eq!(transponder.orbital_position, 282);
                assert_eq!(transponder.polarization, 1);
                assert_eq!(transponder.fastscan_pid, 0);
                assert_eq!(transponder.onid, None);
                assert_eq!(transponder.tables, TableIds::default());
            }
            other => panic!("Expected satellite transponder, got {:?}", other),
        }
    }

    #[test]
    fn test_transponder_defaults_and_hex_overrides() {
        let output = build(
            r#"<provider><transponder frequency="10714000" symbol_rate="22000000" orbital_position="192"
                nit_pid="0x0f" bat_table_id="4b" fastscan_pid="0x384" fastscan_table_id="0xbc"
                onid="1" tsid="1051" bandwidth="7"/></provider>"#,
        );

        let Some(Transponder::Satellite(transponder)) = output.draft.transponder else {
            panic!("transponder should be accepted");
        };
        assert_eq!(transponder.tables.nit_pid, 0x0f);
        assert_eq!(transponder.tables.bat_table_id, 0x4b);
        assert_eq!(transponder.tables.sdt_pid, 0x11);
        assert_eq!(transponder.fastscan_pid, 0x384);
        assert_eq!(transponder.fastscan_table_id, 0xbc);
        assert_eq!(transponder.system, frontend::satellite::SYSTEM_DVB_S);
        assert_eq!(transponder.modulation, frontend::satellite::MODULATION_QPSK);
        assert_eq!(transponder.inversion, frontend::satellite::INVERSION_UNKNOWN);
        assert_eq!(transponder.pilot, frontend::satellite::PILOT_UNKNOWN);
        assert_eq!(transponder.onid, Some(1));
        assert_eq!(transponder.tsid, Some(1051));
    }

    #[test]
    fn test_transponder_without_core_tuning_is_dropped() {
        let output = build(
            r#"<provider><transponder frequency="10714000" symbol_rate="22000000"/></provider>"#,
        );
        assert_eq!(output.draft.transponder, None);
        assert!(output.issues.is_empty());
    }

    #[test]
    fn test_transponder_with_bad_number_is_dropped_with_issue() {
        let output = build(
            r#"<provider><transponder frequency="10714000" symbol_rate="22000000" orbital_position="192" sdt_pid="xyz"/></provider>"#,
        );
        assert_eq!(output.draft.transponder, None);
        assert_eq!(
            output.issues,
            vec![FieldIssue::InvalidNumber {
                element: "transponder",
                attribute: "sdt_pid".to_string(),
                value: "xyz".to_string(),
                expected: "hexadecimal",
            }]
        );
    }

    #[test]
    fn test_unknown_protocol_is_omitted() {
        let output = build("<provider><protocol>dvbsi</protocol></provider>");
        assert_eq!(output.draft.protocol, None);

        let output = build("<provider><protocol><![CDATA[sky]]></protocol></provider>");
        assert_eq!(output.draft.protocol, None);
    }

    #[test]
    fn test_cable_configuration_with_bat_ids_needs_lcnbat() {
        let accepted = build(&cable_provider("lcnbat2", CABLE_WITH_BAT)).draft;
        let rejected = build(&cable_provider("lcn", CABLE_WITH_BAT)).draft;

        assert_eq!(accepted.transponder, Some(Transponder::Cable(TableIds::default())));
        match &accepted.bouquets["ziggo"] {
            BouquetConfig::Cable(cable) => {
                assert_eq!(cable.bouquet, Some(0x10));
                assert_eq!(cable.region, Some(0x1));
                assert_eq!(cable.fec_inner, frontend::cable::FEC_AUTO);
                assert_eq!(cable.modulation, frontend::cable::MODULATION_AUTO);
                assert_eq!(cable.name, "Ziggo");
            }
            other => panic!("Expected cable bouquet, got {:?}", other),
        }
        assert!(rejected.bouquets.is_empty());
    }

    #[test]
    fn test_plain_cable_configuration_rejected_under_lcnbat() {
        assert!(build(&cable_provider("lcn", CABLE_PLAIN)).draft.bouquets.contains_key("ziggo"));
        assert!(build(&cable_provider("lcnbat", CABLE_PLAIN)).draft.bouquets.is_empty());
    }

    #[test]
    fn test_cable_configuration_with_only_region_is_rejected() {
        let configuration = r#"<configuration key="k" netid="1" bouquettype="tv" frequency="1" symbol_rate="1" system="0" region="1">K</configuration>"#;
        assert!(build(&cable_provider("lcn", configuration)).draft.bouquets.is_empty());
        assert!(build(&cable_provider("lcnbat", configuration)).draft.bouquets.is_empty());
    }

    #[test]
    fn test_cable_gate_uses_protocol_declared_later() {
        let content = format!(
            "<provider><dvbcconfigs>{CABLE_WITH_BAT}</dvbcconfigs><protocol>lcnbat</protocol></provider>"
        );
        assert!(build(&content).draft.bouquets.contains_key("ziggo"));
    }

    #[test]
    fn test_cable_configuration_missing_netid_is_rejected() {
        let configuration = r#"<configuration key="k" bouquettype="tv" frequency="1" symbol_rate="1" system="0">K</configuration>"#;
        assert!(build(&cable_provider("lcn", configuration)).draft.bouquets.is_empty());
    }

    #[test]
    fn test_terrestrial_configuration_defaults() {
        let output = build(
            r#"<provider>
	<dvbtconfigs>
		<configuration key="london" frequency="490000000" bandwidth="7000000">London</configuration>
		<configuration key="nofreq">Missing frequency</configuration>
		<configuration key="noname" frequency="1"></configuration>
	</dvbtconfigs>
</provider>"#,
        );

        let draft = output.draft;
        assert_eq!(
            draft.transponder,
            Some(Transponder::Terrestrial(TableIds::terrestrial()))
        );
        assert_eq!(draft.bouquets.len(), 1);
        let BouquetConfig::Terrestrial(london) = &draft.bouquets["london"] else {
            panic!("Expected terrestrial bouquet");
        };
        assert_eq!(london.frequency, 490000000);
        assert_eq!(london.bandwidth, 7000000);
        assert_eq!(london.system, frontend::terrestrial::SYSTEM_DVB_T);
        assert_eq!(london.modulation, frontend::terrestrial::MODULATION_AUTO);
        assert_eq!(london.code_rate_hp, frontend::terrestrial::FEC_AUTO);
        assert_eq!(london.guard_interval, frontend::terrestrial::GUARD_INTERVAL_AUTO);
        assert_eq!(london.hierarchy, frontend::terrestrial::HIERARCHY_AUTO);
        assert_eq!(london.onid, None);
    }

    #[test]
    fn test_satellite_configuration_requires_all_fields() {
        let output = build(
            r#"<provider><dvbsconfigs>
		<configuration key="a" bouquet="0x1000" region="0x3">Atlantic</configuration>
		<configuration key="b" bouquet="0x1000">No region</configuration>
		<configuration key="c" bouquet="0x1000" region="1"></configuration>
		<configuration bouquet="0x1000" region="1">No key</configuration>
	</dvbsconfigs></provider>"#,
        );
        let keys: Vec<_> = output.draft.bouquets.keys().cloned().collect();
        assert_eq!(keys, vec!["a"]);
        let BouquetConfig::Satellite(atlantic) = &output.draft.bouquets["a"] else {
            panic!("Expected satellite bouquet");
        };
        assert_eq!((atlantic.bouquet, atlantic.region), (0x1000, 0x3));
    }

    #[test]
    fn test_later_configuration_with_same_key_wins() {
        let output = build(
            r#"<provider><dvbsconfigs>
		<configuration key="a" bouquet="1" region="1">First</configuration>
		<configuration key="a" bouquet="2" region="2">Second</configuration>
	</dvbsconfigs></provider>"#,
        );
        assert_eq!(output.draft.bouquets["a"].name(), "Second");
    }

    #[test]
    fn test_sections_skip_entries_without_number() {
        let output = build(
            r#"<provider><sections>
		<section number="1">Entertainment</section>
		<section>Orphan</section>
		<section number="abc">Bad</section>
		<section number="2"></section>
		<section number=" 3 ">News &amp; Weather</section>
	</sections></provider>"#,
        );
        let sections = output.draft.sections.unwrap();
        assert_eq!(sections.len(), 2);
        assert_eq!(sections[&1], "Entertainment");
        assert_eq!(sections[&3], "News & Weather");
        assert_eq!(output.issues.len(), 1);
    }

    #[test]
    fn test_negative_numbers_except_unset_are_kept() {
        let output = build(
            r#"<provider><sections>
		<section number="-2">Hidden</section>
		<section number="-1">Unset</section>
	</sections><swapchannels>
		<channel number="-2" with="3"/>
		<channel number="-1" with="4"/>
		<channel number="5" with="-1"/>
	</swapchannels></provider>"#,
        );

        let sections = output.draft.sections.unwrap();
        assert_eq!(sections, BTreeMap::from([(-2, "Hidden".to_string())]));
        assert_eq!(
            output.draft.swapchannels,
            vec![SwapChannel {
                number: -2,
                with: 3,
                conditional: None,
            }]
        );
        assert!(output.issues.is_empty());
    }

    #[test]
    fn test_swapchannels_require_number_and_with() {
        let output = build(
            r#"<provider><swapchannels>
		<channel number="101" with="103"/>
		<channel number="5"/>
		<channel with="6"/>
		<channel number="102" with="104" conditional="sd_only"/>
	</swapchannels></provider>"#,
        );
        assert_eq!(
            output.draft.swapchannels,
            vec![
                SwapChannel {
                    number: 101,
                    with: 103,
                    conditional: None,
                },
                SwapChannel {
                    number: 102,
                    with: 104,
                    conditional: Some("sd_only".to_string()),
                },
            ]
        );
    }

    #[test]
    fn test_servicehacks_takes_last_cdata_trimmed() {
        let output = build(
            "<provider><servicehacks><![CDATA[first]]><![CDATA[\n  skip = True\n]]></servicehacks></provider>",
        );
        assert_eq!(output.draft.servicehacks.as_deref(), Some("skip = True"));

        let output = build("<provider><servicehacks>not cdata</servicehacks></provider>");
        assert_eq!(output.draft.servicehacks, None);
    }

    #[test]
    fn test_visible_service_flag() {
        let set = build(r#"<provider><visibleserviceflag ignore="1"/></provider>"#);
        let zero = build(r#"<provider><visibleserviceflag ignore="0"/></provider>"#);
        let absent = build(r#"<provider><visibleserviceflag/></provider>"#);
        let sticky = build(
            r#"<provider><visibleserviceflag ignore="1"/><visibleserviceflag ignore="0"/></provider>"#,
        );

        assert!(set.draft.ignore_visible_service_flag);
        assert!(!zero.draft.ignore_visible_service_flag);
        assert!(!absent.draft.ignore_visible_service_flag);
        assert!(sticky.draft.ignore_visible_service_flag);
    }

    #[test]
    fn test_non_provider_root_yields_empty_draft() {
        let output = build("<providers><name>x</name></providers>");
        assert_eq!(output.draft, ProviderDraft::new("test"));
    }

    #[test]
    fn test_scalar_text_fields() {
        let output = build(
            "<provider><bouquettype>sat</bouquettype><netid>2</netid><dependent>sky_uk</dependent><name><![CDATA[x]]></name></provider>",
        );
        assert_eq!(output.draft.bouquettype.as_deref(), Some("sat"));
        assert_eq!(output.draft.netid.as_deref(), Some("2"));
        assert_eq!(output.draft.dependent, "sky_uk");
        assert_eq!(output.draft.name, None);
    }

    #[test]
    fn test_parse_integer_leniency() {
        assert_eq!(parse_integer(" 42 ", Radix::Decimal), Some(42));
        assert_eq!(parse_integer("-7", Radix::Decimal), Some(-7));
        assert_eq!(parse_integer("+7", Radix::Decimal), Some(7));
        assert_eq!(parse_integer("0x4a", Radix::Hexadecimal), Some(0x4a));
        assert_eq!(parse_integer("4A", Radix::Hexadecimal), Some(0x4a));
        assert_eq!(parse_integer("0x", Radix::Hexadecimal), None);
        assert_eq!(parse_integer("12a", Radix::Decimal), None);
        assert_eq!(parse_integer("", Radix::Decimal), None);
        assert_eq!(parse_integer("--1", Radix::Decimal), None);
    }
}
